//! Modification engine — pure transformation of source documents' line
//! items into a new line-item set.
//!
//! Two entry points: [`apply_clone`] (keyword-driven edits to one source)
//! and [`combine_for_merge`] (concatenation across several sources).  Both
//! defensively recover broken source data instead of failing: a missing or
//! NaN rate is recomputed as `total / quantity`, and an invalid quantity
//! defaults to 1.

use tracing::debug;

use crate::document::{LineItem, MeasurementType, SourceDocument};
use crate::intent::{Modifications, NewItem};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// The result of applying clone modifications to a source document.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CloneOutcome {
    pub items: Vec<LineItem>,
    /// Sum of item totals.
    pub subtotal: f64,
    /// `modifications.new_total` when present, else the subtotal.
    pub total: f64,
}

/// The result of combining several selected documents into one.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MergeOutcome {
    pub items: Vec<LineItem>,
    pub subtotal: f64,
}

// ---------------------------------------------------------------------------
// Keyword matching
// ---------------------------------------------------------------------------

/// Loose category vocabulary for the final matching tier.
const CATEGORY_WORDS: [&str; 9] = [
    "service", "labor", "material", "fee", "cost", "charge", "work", "install", "delivery",
];

/// Tiered fuzzy match of a spoken keyword against an item description,
/// case-insensitive.
///
/// 1. Substring containment — exact phrase match, cheapest and most
///    precise.
/// 2. Cross-prefix match between keyword words and description words
///    (both longer than 2 characters, equal words excluded) — tolerates
///    partial phrasing like "labor" against "laborer".
/// 3. Category fallback: the keyword and the description both contain the
///    same word from a fixed category vocabulary — tolerates loose voice
///    phrasing like "work charge" against "installation work".
pub fn matches_keyword(description: &str, keyword: &str) -> bool {
    let desc = description.to_lowercase();
    let kw = keyword.trim().to_lowercase();
    if kw.is_empty() {
        return false;
    }

    if desc.contains(&kw) {
        return true;
    }

    let desc_words: Vec<&str> = desc.split_whitespace().filter(|w| w.len() > 2).collect();
    for kword in kw.split_whitespace().filter(|w| w.len() > 2) {
        for dword in &desc_words {
            if kword.len() != dword.len()
                && (dword.starts_with(kword) || kword.starts_with(dword))
            {
                return true;
            }
        }
    }

    CATEGORY_WORDS
        .iter()
        .any(|cat| kw.contains(cat) && desc.contains(cat))
}

// ---------------------------------------------------------------------------
// Seeding
// ---------------------------------------------------------------------------

/// Re-seed a source line item into a fresh derived-total item, recovering
/// broken quantity/rate data.
fn reseed(item: &LineItem) -> LineItem {
    let quantity = if item.quantity.is_finite() && item.quantity > 0.0 {
        item.quantity
    } else {
        1.0
    };
    let rate = if item.rate.is_finite() && item.rate > 0.0 {
        item.rate
    } else if item.total.is_finite() && item.total > 0.0 {
        item.total / quantity
    } else {
        0.0
    };

    let mut seeded = LineItem::new(item.description.clone(), quantity, item.unit.clone(), rate);
    seeded.measurement_type = item.measurement_type;
    seeded.dimensions = item.dimensions.clone();
    seeded
}

fn item_from_new(add: &NewItem) -> LineItem {
    let mut item = LineItem::new(
        add.description.clone(),
        add.quantity.filter(|q| q.is_finite() && *q > 0.0).unwrap_or(1.0),
        add.unit.clone().unwrap_or_else(|| "unit".to_string()),
        add.rate.filter(|r| r.is_finite() && *r >= 0.0).unwrap_or(0.0),
    );
    item.measurement_type = add.measurement_type.unwrap_or(MeasurementType::Unit);
    item
}

// ---------------------------------------------------------------------------
// Clone
// ---------------------------------------------------------------------------

/// Apply clone modifications to a source document's line items.
///
/// Steps, in order: seed from the source (with defensive recovery), apply
/// keyword updates, apply the bare new-amount single-item shortcut, drop
/// keyword-matched removals, append additions, and recompute totals.
pub fn apply_clone(source: &SourceDocument, mods: &Modifications) -> CloneOutcome {
    let mut items: Vec<LineItem> = source.line_items.iter().map(reseed).collect();

    for update in &mods.update_items {
        for item in items.iter_mut() {
            if !matches_keyword(&item.description, &update.match_keyword) {
                continue;
            }
            if let Some(description) = &update.description {
                item.description = description.clone();
            }
            if let Some(rate) = update.rate {
                item.rate = rate;
            }
            if let Some(quantity) = update.quantity {
                item.quantity = quantity;
            }
            item.total = item.quantity * item.rate;
            item.total_overridden = false;
        }
    }

    // Single-item shortcut: a bare amount with no targeted updates replaces
    // only the first item's rate, quantity held.
    if mods.update_items.is_empty()
        && let Some(amount) = mods.new_amount
        && let Some(first) = items.first_mut()
    {
        first.rate = amount;
        first.total = first.quantity * first.rate;
        first.total_overridden = false;
    }

    items.retain(|item| {
        !mods
            .remove_items
            .iter()
            .any(|kw| matches_keyword(&item.description, kw))
    });

    for add in &mods.add_items {
        items.push(item_from_new(add));
    }

    let subtotal: f64 = items.iter().map(|item| item.total).sum();
    let total = mods.new_total.unwrap_or(subtotal);

    debug!(
        source_id = %source.id,
        items = items.len(),
        subtotal,
        total,
        "clone modifications applied"
    );

    CloneOutcome {
        items,
        subtotal,
        total,
    }
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Concatenate the selected documents' line items in selection order.
///
/// Fresh ids are generated and the same defensive recovery as cloning is
/// applied.  No deduplication across sources: identical descriptions from
/// different documents remain separate line items.
pub fn combine_for_merge(selections: &[SourceDocument]) -> MergeOutcome {
    let items: Vec<LineItem> = selections
        .iter()
        .flat_map(|doc| doc.line_items.iter().map(reseed))
        .collect();
    let subtotal: f64 = items.iter().map(|item| item.total).sum();

    debug!(
        sources = selections.len(),
        items = items.len(),
        subtotal,
        "merge selections combined"
    );

    MergeOutcome { items, subtotal }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentType;
    use crate::intent::UpdateItem;

    fn doc(items: Vec<LineItem>) -> SourceDocument {
        SourceDocument {
            id: "doc-1".into(),
            doc_type: DocumentType::Invoice,
            title: "INV-001".into(),
            client: "John".into(),
            amount: items.iter().map(|i| i.total).sum(),
            date: None,
            line_items: items,
            client_email: None,
            client_phone: None,
        }
    }

    #[test]
    fn keyword_substring_tier() {
        assert!(matches_keyword("General Labor", "labor"));
        assert!(matches_keyword("Rush Fee", "rush fee"));
    }

    #[test]
    fn keyword_prefix_tier() {
        // "labor" is a prefix of "laborer"; different lengths, so the
        // cross-prefix tier fires.
        assert!(matches_keyword("Laborer hours", "labor hours extra"));
        assert!(!matches_keyword("Delivery Fee", "install"));
    }

    #[test]
    fn keyword_category_fallback_tier() {
        // Not a substring, and the shared word "work" is equal on both
        // sides (no proper prefix), so only the category tier matches.
        assert!(matches_keyword("Installation work", "work charge"));
        // Shared non-category word does not match.
        assert!(!matches_keyword("Installation blue", "blue charge"));
    }

    #[test]
    fn clone_updates_matching_items() {
        let source = doc(vec![
            LineItem::new("General Labor", 10.0, "hour", 50.0),
            LineItem::new("Materials", 1.0, "job", 300.0),
        ]);
        let mods = Modifications {
            update_items: vec![UpdateItem {
                match_keyword: "labor".into(),
                description: None,
                rate: Some(60.0),
                quantity: None,
            }],
            ..Modifications::default()
        };

        let outcome = apply_clone(&source, &mods);
        assert_eq!(outcome.items.len(), 2);
        assert_eq!(outcome.items[0].rate, 60.0);
        assert_eq!(outcome.items[0].total, 600.0);
        // Non-matching items pass through unchanged.
        assert_eq!(outcome.items[1].total, 300.0);
        assert_eq!(outcome.subtotal, 900.0);
        assert_eq!(outcome.total, 900.0);
    }

    #[test]
    fn clone_bare_new_amount_replaces_first_rate_only() {
        let source = doc(vec![
            LineItem::new("Painting", 2.0, "room", 200.0),
            LineItem::new("Supplies", 1.0, "job", 100.0),
        ]);
        let mods = Modifications {
            new_amount: Some(250.0),
            ..Modifications::default()
        };

        let outcome = apply_clone(&source, &mods);
        // Quantity held, rate replaced.
        assert_eq!(outcome.items[0].quantity, 2.0);
        assert_eq!(outcome.items[0].rate, 250.0);
        assert_eq!(outcome.items[0].total, 500.0);
        assert_eq!(outcome.items[1].total, 100.0);
    }

    #[test]
    fn clone_new_amount_ignored_when_updates_present() {
        let source = doc(vec![LineItem::new("Painting", 1.0, "room", 200.0)]);
        let mods = Modifications {
            update_items: vec![UpdateItem {
                match_keyword: "painting".into(),
                description: None,
                rate: Some(300.0),
                quantity: None,
            }],
            new_amount: Some(999.0),
            ..Modifications::default()
        };

        let outcome = apply_clone(&source, &mods);
        assert_eq!(outcome.items[0].rate, 300.0);
    }

    #[test]
    fn clone_removes_keyword_matched_items() {
        let source = doc(vec![
            LineItem::new("Rush Fee", 1.0, "unit", 150.0),
            LineItem::new("Materials", 1.0, "job", 300.0),
        ]);
        let mods = Modifications {
            remove_items: vec!["rush fee".into()],
            ..Modifications::default()
        };

        let outcome = apply_clone(&source, &mods);
        assert_eq!(outcome.items.len(), 1);
        assert_eq!(outcome.items[0].description, "Materials");
        assert_eq!(outcome.subtotal, 300.0);
    }

    #[test]
    fn clone_adds_items_with_defaults() {
        let source = doc(vec![]);
        let mods = Modifications {
            add_items: vec![NewItem {
                description: "Cleanup".into(),
                quantity: None,
                unit: None,
                rate: None,
                measurement_type: None,
            }],
            ..Modifications::default()
        };

        let outcome = apply_clone(&source, &mods);
        assert_eq!(outcome.items.len(), 1);
        let added = &outcome.items[0];
        assert_eq!(added.quantity, 1.0);
        assert_eq!(added.unit, "unit");
        assert_eq!(added.rate, 0.0);
        assert!(!added.id.is_empty());
    }

    #[test]
    fn clone_new_total_overrides_subtotal() {
        let source = doc(vec![LineItem::new("Labor", 1.0, "job", 400.0)]);
        let mods = Modifications {
            new_total: Some(350.0),
            ..Modifications::default()
        };

        let outcome = apply_clone(&source, &mods);
        assert_eq!(outcome.subtotal, 400.0);
        assert_eq!(outcome.total, 350.0);
    }

    #[test]
    fn clone_recovers_broken_rate_from_total() {
        let mut broken = LineItem::new("Flat job", 2.0, "unit", 0.0);
        broken.total = 500.0; // rate missing upstream, only the total survived
        let source = doc(vec![broken]);

        let outcome = apply_clone(&source, &Modifications::default());
        assert_eq!(outcome.items[0].rate, 250.0);
        assert_eq!(outcome.items[0].total, 500.0);
    }

    #[test]
    fn merge_concatenates_without_dedup() {
        let first = doc(vec![
            LineItem::new("Labor", 1.0, "job", 100.0),
            LineItem::new("Materials", 1.0, "job", 250.0),
        ]);
        let second = doc(vec![LineItem::new("Labor", 1.0, "job", 50.0)]);

        let outcome = combine_for_merge(&[first, second]);
        assert_eq!(outcome.items.len(), 3);
        assert_eq!(outcome.subtotal, 400.0);
        // Identical descriptions stay separate.
        let labor_count = outcome
            .items
            .iter()
            .filter(|i| i.description == "Labor")
            .count();
        assert_eq!(labor_count, 2);
    }

    #[test]
    fn merge_generates_fresh_ids() {
        let source = doc(vec![LineItem::new("Labor", 1.0, "job", 100.0)]);
        let original_id = source.line_items[0].id.clone();

        let outcome = combine_for_merge(std::slice::from_ref(&source));
        assert_ne!(outcome.items[0].id, original_id);
    }

    #[test]
    fn merge_of_nothing_is_empty() {
        let outcome = combine_for_merge(&[]);
        assert!(outcome.items.is_empty());
        assert_eq!(outcome.subtotal, 0.0);
    }
}

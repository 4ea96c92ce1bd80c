//! Unit tests for ingredient status reconciliation.
//!
//! The rule-level matching behaviour is covered next to the matcher
//! itself; these tests exercise the reconcile pass and the precedence of
//! the authoritative unavailability verdict.

use std::collections::HashMap;

use cartstream::matcher::{match_line, reconcile};
use cartstream::models::cart::CartLine;
use cartstream::models::recipe::IngredientCartStatus;

fn line(product_id: &str, product_name: &str, quantity: u32) -> CartLine {
    CartLine {
        product_id: product_id.to_owned(),
        product_name: product_name.to_owned(),
        quantity,
    }
}

fn names(entries: &[&str]) -> Vec<String> {
    entries.iter().map(|s| (*s).to_owned()).collect()
}

#[test]
fn match_line_returns_highest_precedence_candidate() {
    let cart = vec![line("P1", "chicken stock", 1), line("P2", "Chicken", 2)];

    // The exact match on P2 must win over the containment match on P1,
    // regardless of cart order.
    let matched = match_line("chicken", &cart).expect("match");
    assert_eq!(matched.product_id, "P2");
}

#[test]
fn reconcile_marks_matched_ingredients_in_cart() {
    let cart = vec![line("P1", "Broccoli", 2), line("P2", "Sea Salt", 1)];
    let ingredients = names(&["Broccoli", "Salt", "Saffron"]);
    let mut status = HashMap::new();

    reconcile(&ingredients, &cart, &[], &mut status);

    assert_eq!(
        status.get("Broccoli"),
        Some(&IngredientCartStatus::InCart {
            quantity: 2,
            product_id: "P1".to_owned(),
        })
    );
    assert_eq!(
        status.get("Salt"),
        Some(&IngredientCartStatus::InCart {
            quantity: 1,
            product_id: "P2".to_owned(),
        })
    );
    // Unmatched with no verdict: stays absent.
    assert!(!status.contains_key("Saffron"));
}

#[test]
fn unavailable_verdict_wins_over_cart_match() {
    let cart = vec![line("P1", "Ginger", 3)];
    let ingredients = names(&["Grated Fresh Ginger"]);
    let unavailable = names(&["Ginger"]);
    let mut status = HashMap::new();

    reconcile(&ingredients, &cart, &unavailable, &mut status);

    assert_eq!(
        status.get("Grated Fresh Ginger"),
        Some(&IngredientCartStatus::NotAvailable)
    );
}

#[test]
fn not_available_is_never_overwritten() {
    let cart = vec![line("P1", "Ginger", 3)];
    let ingredients = names(&["Ginger"]);
    let mut status = HashMap::new();
    status.insert("Ginger".to_owned(), IngredientCartStatus::NotAvailable);

    // A later pass with no verdict and a matching cart line must not
    // resurrect the ingredient.
    reconcile(&ingredients, &cart, &[], &mut status);

    assert_eq!(
        status.get("Ginger"),
        Some(&IngredientCartStatus::NotAvailable)
    );
}

#[test]
fn repeated_reconcile_tracks_cart_changes() {
    let ingredients = names(&["Broccoli"]);
    let mut status = HashMap::new();

    reconcile(&ingredients, &[line("P1", "Broccoli", 1)], &[], &mut status);
    assert_eq!(
        status.get("Broccoli"),
        Some(&IngredientCartStatus::InCart {
            quantity: 1,
            product_id: "P1".to_owned(),
        })
    );

    reconcile(&ingredients, &[line("P1", "Broccoli", 4)], &[], &mut status);
    assert_eq!(
        status.get("Broccoli"),
        Some(&IngredientCartStatus::InCart {
            quantity: 4,
            product_id: "P1".to_owned(),
        })
    );
}

//! Fuzzy ingredient-to-cart-line matching.
//!
//! A fast client-facing heuristic for instant UI feedback. It operates
//! independently of the authoritative server-side catalog matcher and may
//! disagree with it; a `NotAvailable` verdict from the authoritative source
//! always takes precedence and is never overwritten here.
//!
//! Rules run in strict precedence order and the first rule that succeeds
//! wins. There is no scoring of multiple candidates.

use std::collections::HashMap;

use crate::models::cart::CartLine;
use crate::models::recipe::IngredientCartStatus;

/// Tokens at or below this length are ignored by the token-overlap rule.
const MIN_TOKEN_LEN: usize = 3;

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Rule 1: exact equality of normalized names.
fn rule_exact(ingredient: &str, product: &str) -> bool {
    ingredient == product
}

/// Rule 2: containment in either direction.
fn rule_contains(ingredient: &str, product: &str) -> bool {
    product.contains(ingredient) || ingredient.contains(product)
}

/// Rule 3: any long-enough ingredient token is a substring of, or
/// contains, any long-enough product token.
fn rule_tokens(ingredient: &str, product: &str) -> bool {
    let long_tokens = |s: &str| {
        s.split_whitespace()
            .filter(|t| t.len() > MIN_TOKEN_LEN)
            .map(str::to_owned)
            .collect::<Vec<_>>()
    };
    let ingredient_tokens = long_tokens(ingredient);
    let product_tokens = long_tokens(product);
    ingredient_tokens.iter().any(|it| {
        product_tokens
            .iter()
            .any(|pt| it.contains(pt.as_str()) || pt.contains(it.as_str()))
    })
}

const RULES: [fn(&str, &str) -> bool; 3] = [rule_exact, rule_contains, rule_tokens];

/// Match an ingredient name against cart lines, returning the first line
/// accepted by the highest-precedence rule.
#[must_use]
pub fn match_line<'a>(ingredient: &str, lines: &'a [CartLine]) -> Option<&'a CartLine> {
    let needle = normalize(ingredient);
    for rule in RULES {
        if let Some(line) = lines
            .iter()
            .find(|line| rule(&needle, &normalize(&line.product_name)))
        {
            return Some(line);
        }
    }
    None
}

/// Match an ingredient name against a product-name-to-quantity map.
///
/// Returns the matched quantity, or `0` when no rule matches ("not in
/// cart").
#[must_use]
pub fn match_quantity(ingredient: &str, products: &HashMap<String, u32>) -> u32 {
    let needle = normalize(ingredient);
    for rule in RULES {
        if let Some(quantity) = products
            .iter()
            .find(|(name, _)| rule(&needle, &normalize(name)))
            .map(|(_, quantity)| *quantity)
        {
            return quantity;
        }
    }
    0
}

/// Whether an ingredient matches any entry of the authoritative unmatched
/// list. The authoritative matcher returns cleaned names ("Ginger"), so a
/// containment check in either direction maps them back onto the recipe's
/// original names ("Grated Fresh Ginger").
fn authoritative_unavailable(ingredient: &str, unavailable: &[String]) -> bool {
    let needle = normalize(ingredient);
    unavailable.iter().any(|entry| {
        let entry = normalize(entry);
        needle.contains(&entry) || entry.contains(&needle)
    })
}

/// Reconcile ingredient statuses against the current cart.
///
/// Updates `status` in place for each of `ingredients`. An ingredient
/// already marked [`IngredientCartStatus::NotAvailable`] is never touched,
/// and a fresh authoritative `NotAvailable` verdict wins over any cart
/// match. Ingredients with no match and no verdict stay absent from the
/// map.
pub fn reconcile(
    ingredients: &[String],
    cart: &[CartLine],
    unavailable: &[String],
    status: &mut HashMap<String, IngredientCartStatus>,
) {
    for ingredient in ingredients {
        if matches!(
            status.get(ingredient),
            Some(IngredientCartStatus::NotAvailable)
        ) {
            continue;
        }
        if authoritative_unavailable(ingredient, unavailable) {
            status.insert(ingredient.clone(), IngredientCartStatus::NotAvailable);
        } else if let Some(line) = match_line(ingredient, cart) {
            status.insert(
                ingredient.clone(),
                IngredientCartStatus::InCart {
                    quantity: line.quantity,
                    product_id: line.product_id.clone(),
                },
            );
        }
    }
}

//! End-to-end behavior of the catalog, resolvers and cart reducer.

use shop_commerce::prelude::*;
use shop_commerce::pricing::{min_max_price, variation_price};
use shop_commerce::variation::{format_variation_label, parse_variation_tiers};

const CATALOG: &str = r#"[
    { "id": "tshirt", "name": "T-Shirt", "price": 300, "image": "tshirt.jpg", "category": "clothing",
      "variations": [
          { "label": "White-S", "price": 300 },
          { "label": "Black-M", "price": 300 }
      ] },
    { "id": "hoodie", "name": "Hoodie", "price": 900, "category": "clothing",
      "variationSchema": { "keys": ["color", "size"] },
      "variations": [
          { "label": "Navy-M", "price": 950, "image": ["navy.jpg"] },
          { "label": "Navy-XL", "price": 1000 },
          "Grey-M"
      ] },
    { "id": "tote", "name": "Tote Bag", "price": 600, "category": "bags" },
    { "id": "bottle", "name": "Bottle", "price": 400, "image": "bottle.jpg", "category": "drinkware" },
    { "id": "notebook", "name": "Notebook", "price": 150,
      "variationSchema": { "keys": ["size", "finish", "pages"] },
      "variations": ["A4-Blank-150", "A5-Lined-100", { "label": "A4-Dotted-200", "price": 220 }] }
]"#;

fn catalog() -> Catalog {
    Catalog::from_json(CATALOG).unwrap()
}

fn product(catalog: &Catalog, id: &str) -> Product {
    catalog.get(&ProductId::new(id)).unwrap().clone()
}

fn tk(amount: i64) -> Money {
    Money::from_major(amount, Currency::BDT)
}

fn line_total(cart: &Cart) -> Money {
    let amount = cart
        .items()
        .iter()
        .map(|i| i.unit_price.amount_minor * i64::from(i.quantity))
        .sum();
    Money::new(amount, Currency::BDT)
}

#[test]
fn test_scenario_a_uniform_variant_prices() {
    let tshirt = product(&catalog(), "tshirt");
    let range = min_max_price(tshirt.base_price, &tshirt.normalized_variations());
    assert_eq!(range, PriceRange::single(tk(300)));
    assert!(range.is_single());
}

#[test]
fn test_scenario_b_repeat_add_merges() {
    let tshirt = product(&catalog(), "tshirt");
    let cart = Cart::default()
        .reduce(&CartAction::add_item(&tshirt, Some("White-S")))
        .reduce(&CartAction::add_item(&tshirt, Some("White-S")));

    assert_eq!(cart.items().len(), 1);
    assert_eq!(cart.items()[0].quantity, 2);
    assert_eq!(cart.items()[0].line_key.as_str(), "tshirt::white-s");
}

#[test]
fn test_scenario_c_zero_quantity_removes() {
    let tshirt = product(&catalog(), "tshirt");
    let cart = Cart::default()
        .reduce(&CartAction::add_item(&tshirt, Some("White-S")))
        .reduce(&CartAction::add_item(&tshirt, Some("White-S")));
    assert_eq!(cart.total(), tk(600));

    let cart = cart.reduce(&CartAction::update_quantity(
        LineKey::new("tshirt::white-s"),
        0,
    ));
    assert!(cart.items().is_empty());
    assert_eq!(cart.total(), tk(0));
}

#[test]
fn test_scenario_d_buy_now_and_restore() {
    let catalog = catalog();
    let cart = Cart::default()
        .reduce(&CartAction::add_item(&product(&catalog, "tshirt"), Some("White-S")))
        .reduce(&CartAction::add_item(&product(&catalog, "tote"), None));
    assert_eq!(cart.total(), tk(900));
    let original = cart.items().to_vec();

    let buying = cart.reduce(&CartAction::set_direct_order(
        &product(&catalog, "bottle"),
        None,
        1,
    ));
    assert!(buying.is_direct_order());
    assert_eq!(buying.items().len(), 1);
    assert_eq!(buying.items()[0].product_id.as_str(), "bottle");
    assert_eq!(buying.total(), tk(400));
    assert_eq!(buying.backup_items(), Some(original.as_slice()));

    let done = buying.reduce(&CartAction::FinalizeDirectOrder);
    assert!(!done.is_direct_order());
    assert!(done.backup_items().is_none());
    assert_eq!(done.items(), original.as_slice());
    assert_eq!(done.total(), tk(900));
}

#[test]
fn test_scenario_e_schema_parsing() {
    let notebook = product(&catalog(), "notebook");
    let tiers = notebook.parse_tiers("A4-Blank-150");
    assert_eq!(tiers.get("size"), Some("A4"));
    assert_eq!(tiers.get("finish"), Some("Blank"));
    assert_eq!(tiers.get("pages"), Some("150"));
    assert_eq!(tiers.len(), 3);
}

#[test]
fn test_schema_round_trip() {
    let schema = VariationSchema::new(["size", "finish", "pages"]);
    let order = schema.keys.clone();
    let assignments = [
        [("size", "A4"), ("finish", "Blank"), ("pages", "150")],
        [("size", "A5"), ("finish", "Lined"), ("pages", "100")],
        [("size", "B6"), ("finish", "Dotted"), ("pages", "80")],
    ];
    for assignment in assignments {
        let tiers: VariationTiers = assignment.into_iter().collect();
        let label = format_variation_label(&tiers, Some(&order));
        assert_eq!(parse_variation_tiers(&label, Some(&schema)), tiers);
    }
}

#[test]
fn test_schema_round_trip_with_absent_keys() {
    let schema = VariationSchema::new(["size", "finish", "pages"]);
    let tiers: VariationTiers = [("size", "A4"), ("finish", "Blank")].into_iter().collect();
    let label = format_variation_label(&tiers, Some(&schema.keys));
    assert_eq!(label, "A4-Blank");
    assert_eq!(parse_variation_tiers(&label, Some(&schema)), tiers);
}

#[test]
fn test_prices_stay_within_range() {
    for product in catalog().iter() {
        let variants = product.normalized_variations();
        let range = min_max_price(product.base_price, &variants);
        if variants.is_empty() {
            assert_eq!(range, PriceRange::single(product.base_price));
        }
        for variant in &variants {
            let price = variation_price(product.base_price, &variants, Some(&variant.label));
            assert!(range.contains(&price), "{} {}", product.id, variant.label);
        }
    }
}

#[test]
fn test_hoodie_resolution() {
    let hoodie = product(&catalog(), "hoodie");
    assert_eq!(hoodie.price_range().display(), "\u{09f3}900.00 - \u{09f3}1000.00");
    assert_eq!(hoodie.price_for(Some("navy-m")), tk(950));
    assert_eq!(hoodie.price_for(Some("Grey-M")), tk(900));
    assert_eq!(hoodie.price_for(Some("Pink-S")), tk(900));
    assert_eq!(hoodie.image_for(Some("Navy-M")), "navy.jpg");
    assert_eq!(hoodie.image_for(Some("Navy-XL")), "");
    assert_eq!(hoodie.tier_values("size"), vec!["M", "XL"]);

    let tiers: VariationTiers = [("size", "XL"), ("color", "Navy")].into_iter().collect();
    assert_eq!(hoodie.variant_by_tiers(&tiers).map(|v| v.label), Some("Navy-XL".to_string()));
}

#[test]
fn test_squash_is_idempotent() {
    let catalog = catalog();
    let mut cart = Cart::default();
    for (id, variation) in [
        ("tshirt", Some("White-S")),
        ("tote", None),
        ("tshirt", Some("Black-M")),
        ("tshirt", Some("White-S")),
    ] {
        cart.apply(&CartAction::add_item(&product(&catalog, id), variation));
    }

    let once = cart.reduce(&CartAction::SquashDuplicates);
    let twice = once.reduce(&CartAction::SquashDuplicates);
    assert_eq!(once, twice);
    assert_eq!(once.total(), cart.total());
}

#[test]
fn test_total_matches_items_after_any_sequence() {
    let catalog = catalog();
    let hoodie = product(&catalog, "hoodie");
    let tshirt = product(&catalog, "tshirt");
    let bottle = product(&catalog, "bottle");

    let actions = vec![
        CartAction::add_item(&hoodie, Some("Navy-M")),
        CartAction::add_item(&tshirt, Some("Black-M")),
        CartAction::add_item(&hoodie, Some("Navy-M")),
        CartAction::update_quantity(LineKey::new("hoodie::navy-m"), 7),
        CartAction::add_item(&bottle, None),
        CartAction::remove_item(LineKey::new("tshirt::black-m")),
        CartAction::update_quantity(LineKey::new("bottle::default"), 3),
        CartAction::add_item(&hoodie, Some("Grey-M")),
        CartAction::update_quantity(LineKey::new("hoodie::navy-m"), -1),
        CartAction::remove_item(LineKey::new("missing::default")),
        CartAction::add_item(&tshirt, None),
    ];

    let mut cart = Cart::default();
    for action in &actions {
        cart.apply(action);
        assert_eq!(cart.total(), line_total(&cart), "after {}", action.name());
    }
    assert_eq!(cart.total(), tk(400 * 3 + 900 + 300));
}

#[test]
fn test_direct_order_restores_multiset() {
    let catalog = catalog();
    let mut cart = Cart::default();
    cart.apply(&CartAction::add_item(&product(&catalog, "hoodie"), Some("Navy-XL")));
    cart.apply(&CartAction::add_item(&product(&catalog, "notebook"), Some("A4-Dotted-200")));
    cart.apply(&CartAction::update_quantity(LineKey::new("notebook::a4-dotted-200"), 4));
    let before = cart.clone();

    for product_id in ["bottle", "tote", "hoodie"] {
        let restored = before
            .reduce(&CartAction::set_direct_order(&product(&catalog, product_id), None, 2))
            .reduce(&CartAction::FinalizeDirectOrder);
        assert_eq!(restored, before);
    }
}

#[test]
fn test_clear_resets_everything() {
    let catalog = catalog();
    let cart = Cart::default()
        .reduce(&CartAction::add_item(&product(&catalog, "tote"), None))
        .reduce(&CartAction::set_direct_order(&product(&catalog, "bottle"), None, 1))
        .reduce(&CartAction::ClearCart);
    assert_eq!(cart, Cart::default());
}

//! Kit expansion rules.
//!
//! A kit line sells a kit product; its components are separate order lines
//! sharing the kit's reference ("K1", "K2", ...). Everything here is a pure
//! function over the order's lines so the aggregate can decide events from it.

use std::collections::{BTreeSet, HashMap};

use rust_decimal::Decimal;

use erpkit_products::{KitDefinition, KitLine, ProductSnapshot};

use crate::line::{DeliveredMethod, KitLink, KitRole, LineEditPolicy, OrderLine};

/// Prefix of generated kit references.
pub const KIT_REFERENCE_PREFIX: &str = "K";

/// Decimal places kept on rescaled component quantities.
pub const QUANTITY_DIGITS: u32 = 3;

/// Numeric suffix of a kit reference ("K12" → 12, "ABC999" → 999).
///
/// References without trailing digits (or too large to count) yield 0.
pub fn extract_kit_number(reference: &str) -> u32 {
    let prefix_len = reference.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    reference[prefix_len..].parse().unwrap_or(0)
}

/// Next unused reference of an order: highest suffix + 1, `K1` when empty.
pub fn next_kit_reference(lines: &[OrderLine]) -> String {
    let max = lines
        .iter()
        .filter_map(OrderLine::kit_reference)
        .map(extract_kit_number)
        .max()
        .unwrap_or(0);
    format!("{KIT_REFERENCE_PREFIX}{}", max + 1)
}

/// Distinct references used on the order, sorted and comma-separated.
pub fn available_kit_references(lines: &[OrderLine]) -> String {
    let refs: BTreeSet<&str> = lines.iter().filter_map(OrderLine::kit_reference).collect();
    refs.into_iter().collect::<Vec<_>>().join(",")
}

/// The kit line owning `reference`, if any.
pub fn kit_line<'a>(lines: &'a [OrderLine], reference: &str) -> Option<&'a OrderLine> {
    lines
        .iter()
        .find(|l| l.is_kit() && l.kit_reference() == Some(reference))
}

/// Component lines of the kit identified by `reference`, in order.
pub fn kit_components<'a>(
    lines: &'a [OrderLine],
    reference: &'a str,
) -> impl Iterator<Item = &'a OrderLine> + 'a {
    lines
        .iter()
        .filter(move |l| l.is_kit_component() && l.kit_reference() == Some(reference))
}

/// Build the kit line and its component lines.
///
/// `reference` must be unused on the order (see [`next_kit_reference`]);
/// line numbers are allocated from `first_line_no` upwards.
pub fn initialize_kit(
    kit_product: &ProductSnapshot,
    kit: &KitDefinition,
    quantity: Decimal,
    reference: &str,
    first_line_no: u32,
) -> Vec<OrderLine> {
    let mut kit_line = OrderLine::for_product(first_line_no, kit_product.clone(), quantity);
    kit_line.unit_price = Decimal::ZERO;
    kit_line.delivered_method = if kit_product.product_type.is_storable() {
        DeliveredMethod::Stock
    } else {
        DeliveredMethod::Kit
    };
    kit_line.kit = Some(KitLink {
        reference: reference.to_string(),
        role: KitRole::Kit {
            previous_quantity: quantity,
        },
        kit_sequence: 1,
    });
    kit_line.edit_policy = LineEditPolicy::kit();

    let mut lines = vec![kit_line];
    let components = add_kit_components(&lines[0], kit, first_line_no + 1);
    lines.extend(components);
    lines
}

/// One order line per line of the kit definition.
pub fn add_kit_components(
    kit_line: &OrderLine,
    kit: &KitDefinition,
    first_line_no: u32,
) -> Vec<OrderLine> {
    let reference = kit_line.kit_reference().unwrap_or_default();
    kit.lines
        .iter()
        .zip(first_line_no..)
        .zip(2u32..)
        .map(|((kit_line_def, line_no), kit_sequence)| {
            let mut line = prepare_kit_component(kit_line_def, line_no, kit.discount);
            line.sequence = kit_line.sequence;
            line.kit = Some(KitLink {
                reference: reference.to_string(),
                role: KitRole::Component {
                    important: kit_line_def.is_important,
                },
                kit_sequence,
            });
            line
        })
        .collect()
}

fn prepare_kit_component(def: &KitLine, line_no: u32, kit_discount: Decimal) -> OrderLine {
    let mut line = match (def.display_type, &def.component) {
        (None, Some(product)) => {
            let mut line = OrderLine::for_product(line_no, product.clone(), def.quantity);
            if let Some(uom) = &def.uom {
                line.uom = Some(uom.clone());
            }
            line
        }
        (display_type, _) => OrderLine::layout(
            line_no,
            display_type.unwrap_or(erpkit_products::DisplayType::Note),
            String::new(),
        ),
    };

    if let Some(name) = def.name.as_ref().filter(|n| !n.is_empty()) {
        line.name = name.clone();
    }
    if !kit_discount.is_zero() && !line.is_layout() {
        line.discount = kit_discount * Decimal::ONE_HUNDRED;
    }
    line.edit_policy = LineEditPolicy::component(def.is_important);
    line
}

/// Ratio between the kit's new quantity and the quantity its components were
/// scaled for; 1 when the previous quantity is zero.
pub fn quantity_factor(quantity: Decimal, previous_quantity: Decimal) -> Decimal {
    if previous_quantity.is_zero() {
        Decimal::ONE
    } else {
        quantity / previous_quantity
    }
}

/// Outcome of rescaling one kit's components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KitRescale {
    pub reference: String,
    pub factor: Decimal,
    /// `(line_no, new quantity)` for each component whose quantity changes.
    pub quantities: Vec<(u32, Decimal)>,
    /// New `kit_previous_quantity` of the kit line.
    pub previous_quantity: Decimal,
}

/// Rescale the components of `kit` to its current quantity.
///
/// Returns `None` when nothing changes: the kit quantity is zero (components
/// keep their quantities so the kit can be scaled back) or the kit was already
/// scaled for its current quantity.
pub fn rescale_kit_components(lines: &[OrderLine], kit: &OrderLine) -> Option<KitRescale> {
    let reference = kit.kit_reference()?;
    let previous_quantity = kit.kit_previous_quantity()?;

    if kit.quantity.is_zero() || kit.quantity == previous_quantity {
        return None;
    }

    let factor = quantity_factor(kit.quantity, previous_quantity);
    let quantities = if factor == Decimal::ONE {
        Vec::new()
    } else {
        kit_components(lines, reference)
            .filter(|c| !c.is_layout())
            .map(|c| (c.line_no, (c.quantity * factor).round_dp(QUANTITY_DIGITS).normalize()))
            .collect()
    };

    tracing::debug!(
        kit_reference = reference,
        %factor,
        components = quantities.len(),
        "rescaling kit components"
    );

    Some(KitRescale {
        reference: reference.to_string(),
        factor,
        quantities,
        previous_quantity: kit.quantity,
    })
}

/// Delivered quantity of a kit line, derived from its first important component.
pub fn kit_qty_delivered(lines: &[OrderLine], kit: &OrderLine) -> Decimal {
    let Some(reference) = kit.kit_reference() else {
        return Decimal::ZERO;
    };
    let Some(component) = kit_components(lines, reference).find(|c| c.is_important_kit_component())
    else {
        return Decimal::ZERO;
    };

    let ratio = if !component.quantity.is_zero() {
        component.qty_delivered / component.quantity
    } else if !component.qty_delivered.is_zero() {
        Decimal::ONE
    } else {
        Decimal::ZERO
    };
    ratio * kit.quantity
}

/// Component lines whose reference no longer matches any kit line.
pub fn dangling_kit_components(lines: &[OrderLine]) -> Vec<u32> {
    let kit_refs: BTreeSet<&str> = lines
        .iter()
        .filter(|l| l.is_kit())
        .filter_map(OrderLine::kit_reference)
        .collect();

    lines
        .iter()
        .filter(|l| l.is_kit_component())
        .filter(|l| l.kit_reference().is_some_and(|r| !kit_refs.contains(r)))
        .map(|l| l.line_no)
        .collect()
}

/// Number lines 1..n in their current order.
pub fn recompute_sequences(lines: &mut [OrderLine]) {
    for (line, sequence) in lines.iter_mut().zip(1..) {
        line.sequence = sequence;
    }
}

/// Give components their kit's sequence and a 1-based position per reference.
///
/// Kit lines must come before their components in `lines`.
pub fn recompute_kit_sequences(lines: &mut [OrderLine]) {
    let kit_sequences: HashMap<String, u32> = lines
        .iter()
        .filter(|l| l.is_kit())
        .filter_map(|l| l.kit_reference().map(|r| (r.to_string(), l.sequence)))
        .collect();
    let mut next: HashMap<String, u32> = HashMap::new();

    for line in lines.iter_mut() {
        let Some(link) = line.kit.as_mut() else {
            continue;
        };
        if let Some(sequence) = kit_sequences.get(&link.reference) {
            line.sequence = *sequence;
        }
        let counter = next.entry(link.reference.clone()).or_insert(1);
        link.kit_sequence = *counter;
        *counter += 1;
    }
}

/// Renumber an order: plain lines and kits get consecutive sequences,
/// components follow their kit.
pub fn resequence(lines: &mut [OrderLine]) {
    let mut sequence = 0;
    for line in lines.iter_mut() {
        if !line.is_kit_component() {
            sequence += 1;
            line.sequence = sequence;
        }
    }
    recompute_kit_sequences(lines);
}

#[cfg(test)]
mod tests {
    use super::*;
    use erpkit_products::{DisplayType, ProductId, ProductType, Uom};

    fn snapshot(name: &str, product_type: ProductType, price: i64) -> ProductSnapshot {
        ProductSnapshot {
            product_id: ProductId::generate(),
            name: name.to_string(),
            product_type,
            list_price: Decimal::from(price),
            uom: Uom::unit(),
        }
    }

    fn kit_product() -> ProductSnapshot {
        snapshot("Office Kit", ProductType::Service, 10)
    }

    fn kit_definition() -> KitDefinition {
        KitDefinition::new(vec![
            KitLine::component(snapshot("Component A", ProductType::Stockable, 10), Decimal::from(1), true),
            KitLine::component(snapshot("Component B", ProductType::Stockable, 20), Decimal::from(2), true)
                .with_uom(Uom::new("Dozen(s)")),
            KitLine::component(snapshot("Component Z", ProductType::Consumable, 5), Decimal::from(3), false),
        ])
    }

    fn order_with_kit(reference: &str, first_line_no: u32) -> Vec<OrderLine> {
        initialize_kit(&kit_product(), &kit_definition(), Decimal::ONE, reference, first_line_no)
    }

    #[test]
    fn extract_kit_number_reads_trailing_digits() {
        assert_eq!(extract_kit_number("K1"), 1);
        assert_eq!(extract_kit_number("ABC999"), 999);
        assert_eq!(extract_kit_number("WRONG"), 0);
        assert_eq!(extract_kit_number(""), 0);
        assert_eq!(extract_kit_number("K99999999999999999999"), 0);
    }

    #[test]
    fn next_reference_starts_at_k1() {
        assert_eq!(next_kit_reference(&[]), "K1");
    }

    #[test]
    fn next_reference_follows_highest_suffix() {
        let mut lines = order_with_kit("K1", 1);
        lines.extend(order_with_kit("K3", 10));
        assert_eq!(next_kit_reference(&lines), "K4");
    }

    #[test]
    fn available_references_are_sorted_and_unique() {
        let mut lines = order_with_kit("K1", 1);
        lines.extend(order_with_kit("K3", 10));
        lines.extend(order_with_kit("K2", 20));
        lines.push(OrderLine::for_product(30, snapshot("Loose", ProductType::Service, 1), Decimal::ONE));
        assert_eq!(available_kit_references(&lines), "K1,K2,K3");
    }

    #[test]
    fn one_line_per_component() {
        let lines = order_with_kit("K1", 1);
        assert_eq!(lines.len(), 4);
        assert!(lines[0].is_kit());
        assert_eq!(lines[1].name, "Component A");
        assert_eq!(lines[2].name, "Component B");
        assert_eq!(lines[3].name, "Component Z");
        assert!(lines[1..].iter().all(|l| l.is_kit_component()));
        assert!(lines.iter().all(|l| l.kit_reference() == Some("K1")));
        assert_eq!(
            lines.iter().map(|l| l.line_no).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
    }

    #[test]
    fn kit_line_is_free_and_components_keep_list_price() {
        let lines = order_with_kit("K1", 1);
        assert_eq!(lines[0].unit_price, Decimal::ZERO);
        assert_eq!(lines[1].unit_price, Decimal::from(10));
        assert_eq!(lines[0].kit_previous_quantity(), Some(Decimal::ONE));
    }

    #[test]
    fn components_copy_quantity_and_uom() {
        let lines = order_with_kit("K1", 1);
        assert_eq!(lines[1].quantity, Decimal::from(1));
        assert_eq!(lines[2].quantity, Decimal::from(2));
        assert_eq!(lines[3].quantity, Decimal::from(3));
        assert_eq!(lines[2].uom, Some(Uom::new("Dozen(s)")));
        assert_eq!(lines[3].uom, Some(Uom::unit()));
    }

    #[test]
    fn importance_drives_readonly_policy() {
        let lines = order_with_kit("K1", 1);
        assert!(!lines[0].is_important_kit_component());
        assert!(lines[1].is_important_kit_component());
        assert!(lines[2].is_important_kit_component());
        assert!(!lines[3].is_important_kit_component());

        assert_eq!(lines[0].edit_policy, LineEditPolicy::kit());
        assert_eq!(lines[1].edit_policy, LineEditPolicy::component(true));
        assert_eq!(lines[3].edit_policy, LineEditPolicy::editable());
    }

    #[test]
    fn kit_discount_is_applied_as_percent() {
        let kit = kit_definition().with_discount(Decimal::new(2, 1));
        let lines = initialize_kit(&kit_product(), &kit, Decimal::ONE, "K1", 1);
        assert!(lines[1..].iter().all(|l| l.discount == Decimal::from(20)));
        assert_eq!(lines[0].discount, Decimal::ZERO);
    }

    #[test]
    fn sections_and_notes_keep_their_names() {
        let kit = KitDefinition::new(vec![
            KitLine::section("My Section"),
            KitLine::component(snapshot("Component A", ProductType::Stockable, 10), Decimal::ONE, true),
            KitLine::note("My Note"),
        ]);
        let lines = initialize_kit(&kit_product(), &kit, Decimal::ONE, "K1", 1);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1].display_type, Some(DisplayType::Section));
        assert_eq!(lines[1].name, "My Section");
        assert_eq!(lines[2].display_type, None);
        assert_eq!(lines[2].name, "Component A");
        assert_eq!(lines[3].display_type, Some(DisplayType::Note));
        assert_eq!(lines[3].name, "My Note");
    }

    #[test]
    fn service_kits_derive_delivery_from_components() {
        let lines = order_with_kit("K1", 1);
        assert_eq!(lines[0].delivered_method, DeliveredMethod::Kit);

        let stocked = snapshot("Stocked Kit", ProductType::Stockable, 0);
        let lines = initialize_kit(&stocked, &kit_definition(), Decimal::ONE, "K1", 1);
        assert_eq!(lines[0].delivered_method, DeliveredMethod::Stock);
    }

    #[test]
    fn quantity_factor_guards_zero_previous_quantity() {
        assert_eq!(quantity_factor(Decimal::from(3), Decimal::ZERO), Decimal::ONE);
        assert_eq!(quantity_factor(Decimal::from(3), Decimal::from(2)), Decimal::new(15, 1));
    }

    #[test]
    fn rescale_multiplies_every_component() {
        let mut lines = order_with_kit("K1", 1);
        lines[0].quantity = Decimal::from(2);

        let rescale = rescale_kit_components(&lines, &lines[0]).unwrap();
        assert_eq!(rescale.factor, Decimal::from(2));
        assert_eq!(
            rescale.quantities,
            vec![(2, Decimal::from(2)), (3, Decimal::from(4)), (4, Decimal::from(6))]
        );
        assert_eq!(rescale.previous_quantity, Decimal::from(2));
    }

    #[test]
    fn rescale_ignores_zero_kit_quantity() {
        let mut lines = order_with_kit("K1", 1);
        lines[0].quantity = Decimal::ZERO;
        assert_eq!(rescale_kit_components(&lines, &lines[0]), None);
    }

    #[test]
    fn rescale_from_zero_previous_quantity_only_resets_it() {
        let mut lines = order_with_kit("K1", 1);
        lines[0].set_kit_previous_quantity(Decimal::ZERO);

        let rescale = rescale_kit_components(&lines, &lines[0]).unwrap();
        assert_eq!(rescale.factor, Decimal::ONE);
        assert!(rescale.quantities.is_empty());
        assert_eq!(rescale.previous_quantity, Decimal::ONE);
    }

    #[test]
    fn rescale_leaves_other_kits_alone() {
        let mut lines = order_with_kit("K1", 1);
        lines.extend(order_with_kit("K2", 5));
        lines[0].quantity = Decimal::from(3);

        let rescale = rescale_kit_components(&lines, &lines[0]).unwrap();
        assert!(rescale.quantities.iter().all(|(line_no, _)| *line_no < 5));
    }

    #[test]
    fn kit_delivery_follows_first_important_component() {
        let mut lines = order_with_kit("K1", 1);
        lines[0].quantity = Decimal::from(4);
        lines[1].quantity = Decimal::from(8);
        lines[1].qty_delivered = Decimal::from(2);
        lines[2].qty_delivered = Decimal::from(20);

        assert_eq!(kit_qty_delivered(&lines, &lines[0]), Decimal::ONE);
    }

    #[test]
    fn kit_delivery_with_zero_ordered_component() {
        let mut lines = order_with_kit("K1", 1);
        lines[0].quantity = Decimal::from(4);
        lines[1].quantity = Decimal::ZERO;
        assert_eq!(kit_qty_delivered(&lines, &lines[0]), Decimal::ZERO);

        lines[1].qty_delivered = Decimal::ONE;
        assert_eq!(kit_qty_delivered(&lines, &lines[0]), Decimal::from(4));
    }

    #[test]
    fn kit_without_important_component_is_never_delivered() {
        let kit = KitDefinition::new(vec![KitLine::component(
            snapshot("Optional", ProductType::Stockable, 1),
            Decimal::ONE,
            false,
        )]);
        let mut lines = initialize_kit(&kit_product(), &kit, Decimal::ONE, "K1", 1);
        lines[1].qty_delivered = Decimal::ONE;
        assert_eq!(kit_qty_delivered(&lines, &lines[0]), Decimal::ZERO);
    }

    #[test]
    fn dangling_components_are_exactly_the_removed_kits() {
        let mut lines = order_with_kit("K1", 1);
        lines.extend(order_with_kit("K2", 5));
        assert!(dangling_kit_components(&lines).is_empty());

        lines.retain(|l| l.line_no != 1);
        assert_eq!(dangling_kit_components(&lines), vec![2, 3, 4]);

        let remaining: Vec<_> = lines.iter().filter(|l| l.line_no >= 5).collect();
        assert!(remaining.iter().all(|l| l.kit_reference() == Some("K2")));
    }

    #[test]
    fn resequence_groups_components_under_their_kit() {
        let mut lines = vec![OrderLine::for_product(
            1,
            snapshot("Loose", ProductType::Service, 1),
            Decimal::ONE,
        )];
        lines.extend(order_with_kit("K1", 2));
        lines.extend(order_with_kit("K2", 6));

        resequence(&mut lines);

        let sequences: Vec<_> = lines.iter().map(|l| l.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 2, 2, 2, 3, 3, 3, 3]);
        let kit_sequences: Vec<_> = lines.iter().filter_map(OrderLine::kit_sequence).collect();
        assert_eq!(kit_sequences, vec![1, 2, 3, 4, 1, 2, 3, 4]);
    }

    #[test]
    fn recompute_sequences_numbers_lines_in_order() {
        let mut lines = order_with_kit("K1", 7);
        recompute_sequences(&mut lines);
        assert_eq!(lines.iter().map(|l| l.sequence).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: the next reference is one past the highest suffix in use.
            #[test]
            fn next_reference_is_max_plus_one(
                suffixes in prop::collection::vec(1u32..10_000, 0..8)
            ) {
                let mut lines = Vec::new();
                for (i, suffix) in suffixes.iter().enumerate() {
                    lines.extend(order_with_kit(&format!("K{suffix}"), (i as u32) * 10 + 1));
                }
                let expected = suffixes.iter().copied().max().unwrap_or(0) + 1;
                prop_assert_eq!(next_kit_reference(&lines), format!("K{expected}"));
            }

            /// Property: components scale by exactly the kit's quantity factor.
            #[test]
            fn components_scale_by_factor(
                previous in 1i64..50,
                multiplier in 1i64..20,
                divisor in prop::sample::select(vec![1i64, 2, 4, 5, 8, 10]),
            ) {
                let mut lines = initialize_kit(
                    &kit_product(),
                    &kit_definition(),
                    Decimal::from(previous),
                    "K1",
                    1,
                );
                let new_quantity = Decimal::from(previous * multiplier) / Decimal::from(divisor);
                lines[0].quantity = new_quantity;
                let factor = quantity_factor(new_quantity, Decimal::from(previous));

                if let Some(rescale) = rescale_kit_components(&lines, &lines[0]) {
                    prop_assert_eq!(rescale.factor, factor);
                    for (line_no, quantity) in rescale.quantities {
                        let before = lines.iter().find(|l| l.line_no == line_no).unwrap().quantity;
                        prop_assert_eq!(quantity, (before * factor).normalize());
                    }
                } else {
                    prop_assert_eq!(new_quantity, Decimal::from(previous));
                }
            }
        }
    }
}

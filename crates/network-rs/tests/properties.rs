use proptest::prelude::*;
use tcmodel_core::{ElectroSubtype, PrincipalClass};
use tcmodel_network::{scale_count, ColumnSpec, PopulationModel, PopulationSpec, Stratum, StratumSpec};

fn column(sizes: &[u32], counts: Vec<Vec<u32>>) -> ColumnSpec {
    let populations = sizes
        .iter()
        .enumerate()
        .map(|(i, &size)| {
            PopulationSpec::new(&format!("L{}", i), ElectroSubtype::RegularSpiking, PrincipalClass::Pyramidal, size, "T")
        })
        .collect();
    ColumnSpec {
        strata: vec![StratumSpec { stratum: Stratum::Deep, populations }],
        connection_counts: counts,
    }
}

proptest! {
    #[test]
    fn probability_is_count_over_presynaptic_size(
        (sizes, counts) in (1usize..6).prop_flat_map(|n| (
            prop::collection::vec(0u32..2000, n),
            prop::collection::vec(prop::collection::vec(0u32..100, n), n),
        ))
    ) {
        let model = PopulationModel::new(&column(&sizes, counts.clone())).unwrap();
        let probabilities = model.connection_probabilities();

        for (pre, &size) in sizes.iter().enumerate() {
            for post in 0..sizes.len() {
                let expected = if size == 0 { 0.0 } else { f64::from(counts[pre][post]) / f64::from(size) };
                prop_assert_eq!(probabilities[[pre, post]], expected);
            }
        }
    }

    #[test]
    fn scale_down_never_zeroes_a_connection(value in 0u32..10_000, factor in 1u32..50) {
        let scaled = scale_count(value, factor);
        if value == 0 {
            prop_assert_eq!(scaled, 0);
        } else {
            prop_assert!(scaled >= 1);
            prop_assert!(scaled <= value);
            prop_assert_eq!(scaled, std::cmp::max(1, value / factor));
        }
    }
}

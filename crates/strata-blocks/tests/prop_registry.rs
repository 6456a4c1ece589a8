use proptest::prelude::*;
use strata_blocks::registry::{BlockDef, BlockRegistry};
use strata_blocks::AtlasRect;

fn arb_names() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::hash_set("[a-z]{1,12}", 1..32).prop_map(|s| s.into_iter().collect())
}

proptest! {
    // Registration hands out dense sequential ids and name lookup inverts it.
    #[test]
    fn register_then_lookup_roundtrips(names in arb_names(), solids in proptest::collection::vec(any::<bool>(), 32)) {
        let mut reg = BlockRegistry::new();
        for (i, name) in names.iter().enumerate() {
            let solid = solids[i % solids.len()];
            let id = reg.register(BlockDef {
                name: name.clone(),
                atlas: AtlasRect::FULL,
                solid,
                opaque: solid,
            });
            prop_assert_eq!(id as usize, i);
        }
        for (i, name) in names.iter().enumerate() {
            let id = reg.id_by_name(name).expect("registered name resolves");
            prop_assert_eq!(id as usize, i);
            prop_assert_eq!(&reg.get(id).expect("def present").name, name);
        }
    }

    // Predicates never report anything for ids beyond the table.
    #[test]
    fn out_of_range_ids_are_airlike(extra in 0u16..1000) {
        let reg = BlockRegistry::with_defaults();
        let id = reg.blocks.len() as u16 + extra;
        prop_assert!(!reg.is_solid(id));
        prop_assert!(!reg.is_opaque(id));
    }
}

//! Property-based tests for ACL sequence laws.

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use crate::ace::{Ace, PermissionSet, Verb};
    use crate::acl::Acl;
    use crate::store::AclService;
    use crate::tree::MemoryTree;
    use crate::Error;
    use fabryk_core::{PrincipalId, ResourceId};
    use proptest::prelude::*;

    fn arb_ace() -> impl Strategy<Value = Ace> {
        (
            any::<bool>(),
            prop::sample::select(vec!["alice", "bob", "carol", "group:editors"]),
            prop::collection::btree_set(
                prop::sample::select(vec!["view", "edit", "delete", "sdi.change-acls"]),
                1..3,
            ),
        )
            .prop_map(|(allow, principal, perms)| {
                let verb = if allow { Verb::Allow } else { Verb::Deny };
                let perms = PermissionSet::new(perms).unwrap();
                Ace::new(verb, PrincipalId::new(principal), perms).unwrap()
            })
    }

    fn arb_acl() -> impl Strategy<Value = Vec<Ace>> {
        prop::collection::vec(arb_ace(), 0..8)
    }

    fn seeded(entries: &[Ace]) -> (AclService, ResourceId) {
        let tree = MemoryTree::new();
        let root = ResourceId::new("root");
        let node = ResourceId::new("node");
        tree.insert_root(root.clone()).unwrap();
        tree.insert(node.clone(), root).unwrap();
        let service = AclService::in_memory(Arc::new(tree));
        service.create(&ResourceId::new("root")).unwrap();
        service
            .seed(
                &node,
                crate::acl::AclSnapshot {
                    acl: Acl::from(entries.to_vec()),
                    inherit: true,
                },
            )
            .unwrap();
        (service, node)
    }

    proptest! {
        #[test]
        fn test_add_appends_last(entries in arb_acl(), ace in arb_ace()) {
            let (service, node) = seeded(&entries);
            let permissions: Vec<String> = ace.permissions().iter().map(String::from).collect();
            service
                .add(&node, ace.verb(), ace.principal().clone(), permissions)
                .unwrap();
            let after = service.read(&node).unwrap().acl;
            prop_assert_eq!(after.len(), entries.len() + 1);
            prop_assert_eq!(after.get(entries.len()), Some(&ace));
        }

        #[test]
        fn test_remove_preserves_relative_order(entries in arb_acl(), index in 0usize..10) {
            let (service, node) = seeded(&entries);
            let result = service.remove(&node, index);
            let after = service.read(&node).unwrap().acl;
            if index < entries.len() {
                prop_assert!(result.is_ok());
                let mut expected = entries.clone();
                expected.remove(index);
                prop_assert_eq!(after.as_slice(), expected.as_slice());
            } else {
                let is_index_error = matches!(result, Err(Error::Index { .. }));
                prop_assert!(is_index_error);
                prop_assert_eq!(after.as_slice(), entries.as_slice());
            }
        }

        #[test]
        fn test_move_up_then_down_is_identity(entries in arb_acl(), seed in any::<usize>()) {
            prop_assume!(entries.len() > 1);
            let i = 1 + seed % (entries.len() - 1);
            let (service, node) = seeded(&entries);
            prop_assert!(service.move_up(&node, i).unwrap().changed());
            service.move_down(&node, i - 1).unwrap();
            let after = service.read(&node).unwrap().acl;
            prop_assert_eq!(after.as_slice(), entries.as_slice());
        }

        #[test]
        fn test_boundary_moves_are_noops(entries in arb_acl()) {
            prop_assume!(!entries.is_empty());
            let (service, node) = seeded(&entries);
            prop_assert!(!service.move_up(&node, 0).unwrap().changed());
            prop_assert!(!service.move_down(&node, entries.len() - 1).unwrap().changed());
            let after = service.read(&node).unwrap().acl;
            prop_assert_eq!(after.as_slice(), entries.as_slice());
        }

        #[test]
        fn test_decision_is_first_match(entries in arb_acl(), who in 0usize..4, perm in 0usize..3) {
            let principal = ["alice", "bob", "carol", "group:editors"][who];
            let permission = ["view", "edit", "delete"][perm];
            let acl = Acl::from(entries.clone());
            let principals = [PrincipalId::new(principal)];
            let expected = entries
                .iter()
                .find(|ace| ace.principal().as_str() == principal && ace.permissions().grants(permission))
                .map(Ace::verb);
            prop_assert_eq!(acl.decide(&principals, permission), expected);
        }
    }
}

//! Tree assembly: merges the two directional expansions and the spouse
//! map into the nested output shape, after the privacy pass has pruned
//! every hidden person from every adjacency map.

use std::collections::{HashMap, HashSet};

use crate::db::Db;
use crate::error::{KintreeError, Result};
use crate::model::{Actor, Person, RelationType};
use crate::privacy;
use crate::store::{branch, person, relationship};
use super::{spouses, traversal, Direction, FlatTree, TreeNode};

/// Build the nested tree rooted at `root_id`.
///
/// Root missing is `NotFound`; root denied by the guard is `Forbidden`.
/// Every other person that is missing or denied is pruned silently,
/// together with any edge touching it.
pub async fn build_nested_tree(
    db: &Db,
    root_id: &str,
    actor: Option<&Actor>,
    depth: usize,
    include_spouses: bool,
) -> Result<TreeNode> {
    let root = person::find_by_id(db, root_id)
        .await?
        .ok_or_else(|| KintreeError::NotFound(format!("Person {}", root_id)))?;
    if !privacy::check(db, &root, actor).await? {
        return Err(KintreeError::Forbidden(
            "You do not have access to this person".to_string(),
        ));
    }

    // The two expansions write to disjoint maps and may run concurrently.
    let (descendants, ancestors) = tokio::try_join!(
        traversal::expand(db, root_id, depth, Direction::Descendants),
        traversal::expand(db, root_id, depth, Direction::Ancestors),
    )?;

    let mut discovered: HashSet<String> = descendants
        .visited
        .union(&ancestors.visited)
        .cloned()
        .collect();

    // Spouses are resolved only once the discovered set is final.
    let spouse_map = if include_spouses {
        let map = spouses::resolve(db, &discovered).await?;
        for (id, partners) in &map {
            discovered.insert(id.clone());
            discovered.extend(partners.iter().cloned());
        }
        map
    } else {
        HashMap::new()
    };

    // Filter pass: fetch every candidate and its branch, collect a verdict
    // for every node before any map is touched.
    let ids: Vec<String> = discovered.iter().cloned().collect();
    let persons: HashMap<String, Person> = person::find_by_ids(db, &ids)
        .await?
        .into_iter()
        .map(|p| (p.id.clone(), p))
        .collect();

    let branch_ids: Vec<String> = persons
        .values()
        .map(|p| p.branch_id.clone())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let branches = branch::find_by_ids(db, &branch_ids).await?;

    let visible: HashSet<String> = persons
        .values()
        .filter(|p| privacy::can_view(*p, actor, branches.get(&p.branch_id)))
        .map(|p| p.id.clone())
        .collect();

    let hidden = discovered.len() - visible.len();
    if hidden > 0 {
        log::debug!("tree for {}: pruned {} of {} candidates", root_id, hidden, discovered.len());
    }

    let children_map = prune(descendants.adjacency, &visible);
    let parents_map = prune(ancestors.adjacency, &visible);
    let spouse_map = prune(spouse_map, &visible);

    let ctx = AssembleCtx {
        persons: &persons,
        spouse_map: &spouse_map,
    };

    let mut path = HashSet::new();
    let mut node = build_subtree(&ctx, root_id, &children_map, Direction::Descendants, depth, &mut path)
        .ok_or_else(|| KintreeError::NotFound(format!("Person {}", root_id)))?;

    let mut path = HashSet::new();
    if let Some(up) = build_subtree(&ctx, root_id, &parents_map, Direction::Ancestors, depth, &mut path) {
        node.parents = up.parents;
    }

    Ok(node)
}

/// Legacy single-level tree: the root plus its direct parents, children
/// and spouses. Only the root is privacy-checked.
pub async fn build_flat_tree(db: &Db, root_id: &str, actor: Option<&Actor>) -> Result<FlatTree> {
    let root = person::find_by_id(db, root_id)
        .await?
        .ok_or_else(|| KintreeError::NotFound(format!("Person {}", root_id)))?;
    if !privacy::check(db, &root, actor).await? {
        return Err(KintreeError::Forbidden(
            "You do not have access to this person".to_string(),
        ));
    }

    let frontier = [root_id.to_string()];
    let parent_edges = relationship::edges_to(db, &frontier, RelationType::ParentOf).await?;
    let child_edges = relationship::edges_from(db, &frontier, RelationType::ParentOf).await?;
    let spouse_edges = relationship::spouse_edges_touching(db, &frontier).await?;

    let parent_ids: Vec<String> = parent_edges.into_iter().map(|e| e.from_person_id).collect();
    let child_ids: Vec<String> = child_edges.into_iter().map(|e| e.to_person_id).collect();
    let spouse_ids: Vec<String> = spouse_edges
        .into_iter()
        .map(|e| {
            if e.from_person_id == root_id {
                e.to_person_id
            } else {
                e.from_person_id
            }
        })
        .filter(|id| id != root_id)
        .collect();

    let mut all = parent_ids.clone();
    all.extend(child_ids.iter().cloned());
    all.extend(spouse_ids.iter().cloned());
    let fetched: HashMap<String, Person> = person::find_by_ids(db, &all)
        .await?
        .into_iter()
        .map(|p| (p.id.clone(), p))
        .collect();

    let pick = |ids: &[String]| -> Vec<Person> {
        let mut seen = HashSet::new();
        ids.iter()
            .filter(|id| seen.insert((*id).clone()))
            .filter_map(|id| fetched.get(id).cloned())
            .collect()
    };

    Ok(FlatTree {
        parents: pick(&parent_ids),
        children: pick(&child_ids),
        spouses: pick(&spouse_ids),
        root,
    })
}

/// Legacy endpoint: flat de-duplicated ancestor records, no tree nesting,
/// no per-node privacy filtering.
pub async fn list_ancestors(db: &Db, root_id: &str, depth: usize) -> Result<Vec<Person>> {
    list_relatives(db, root_id, depth, Direction::Ancestors).await
}

/// Legacy endpoint: flat de-duplicated descendant records.
pub async fn list_descendants(db: &Db, root_id: &str, depth: usize) -> Result<Vec<Person>> {
    list_relatives(db, root_id, depth, Direction::Descendants).await
}

async fn list_relatives(
    db: &Db,
    root_id: &str,
    depth: usize,
    direction: Direction,
) -> Result<Vec<Person>> {
    if person::find_by_id(db, root_id).await?.is_none() {
        return Err(KintreeError::NotFound(format!("Person {}", root_id)));
    }

    let expansion = traversal::expand(db, root_id, depth, direction).await?;
    let ids: Vec<String> = expansion
        .visited
        .into_iter()
        .filter(|id| id != root_id)
        .collect();

    let mut people = person::find_by_ids(db, &ids).await?;
    people.sort_by(|a, b| a.full_name.cmp(&b.full_name));
    Ok(people)
}

struct AssembleCtx<'a> {
    persons: &'a HashMap<String, Person>,
    spouse_map: &'a HashMap<String, HashSet<String>>,
}

/// Drop every hidden ID from the map, both as a key and as an edge
/// endpoint, so a hidden node never appears as anyone's relative.
fn prune(
    map: HashMap<String, HashSet<String>>,
    visible: &HashSet<String>,
) -> HashMap<String, HashSet<String>> {
    map.into_iter()
        .filter(|(key, _)| visible.contains(key))
        .map(|(key, linked)| {
            let kept = linked
                .into_iter()
                .filter(|id| visible.contains(id))
                .collect();
            (key, kept)
        })
        .collect()
}

/// Spouses render as leaves; they do not recurse (the spouse map is
/// symmetric, recursing would ping-pong forever).
fn spouse_leaves(ctx: &AssembleCtx<'_>, id: &str) -> Vec<TreeNode> {
    let Some(partners) = ctx.spouse_map.get(id) else {
        return Vec::new();
    };
    let mut ordered: Vec<&String> = partners.iter().collect();
    ordered.sort();
    ordered
        .into_iter()
        .filter_map(|sid| ctx.persons.get(sid).cloned())
        .map(TreeNode::leaf)
        .collect()
}

/// Recursive materialization in one direction. `path` holds the IDs on
/// the current root-to-node stack; a candidate already on it is skipped so
/// a true cycle cannot recurse forever, while convergent shared ancestors
/// still appear under every visible branch.
fn build_subtree(
    ctx: &AssembleCtx<'_>,
    id: &str,
    map: &HashMap<String, HashSet<String>>,
    direction: Direction,
    remaining: usize,
    path: &mut HashSet<String>,
) -> Option<TreeNode> {
    let person = ctx.persons.get(id)?.clone();
    let mut node = TreeNode::leaf(person);
    node.spouses = spouse_leaves(ctx, id);

    if remaining == 0 {
        return Some(node);
    }

    path.insert(id.to_string());
    if let Some(linked) = map.get(id) {
        let mut ordered: Vec<&String> = linked.iter().collect();
        ordered.sort();
        for next in ordered {
            if path.contains(next.as_str()) {
                continue;
            }
            if let Some(subtree) = build_subtree(ctx, next, map, direction, remaining - 1, path) {
                match direction {
                    Direction::Descendants => node.children.push(subtree),
                    Direction::Ancestors => node.parents.push(subtree),
                }
            }
        }
    }
    path.remove(id);

    Some(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Privacy, Role};
    use crate::store::test_support::{seed_branch, seed_edge, seed_person, test_db};

    fn admin() -> Actor {
        Actor {
            id: "admin".into(),
            role: Role::Admin,
            is_banned: false,
        }
    }

    fn member(id: &str) -> Actor {
        Actor {
            id: id.into(),
            role: Role::Member,
            is_banned: false,
        }
    }

    fn collect_ids(node: &TreeNode) -> HashSet<String> {
        let mut out = HashSet::new();
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            out.insert(n.person.id.clone());
            stack.extend(n.children.iter());
            stack.extend(n.parents.iter());
            stack.extend(n.spouses.iter());
        }
        out
    }

    #[tokio::test]
    async fn test_nested_three_generations() {
        let (db, _tmp) = test_db().await;
        let (_uid, bid) = seed_branch(&db).await;
        let r = seed_person(&db, &bid, "R", Privacy::Public).await;
        let c = seed_person(&db, &bid, "C", Privacy::Public).await;
        let g = seed_person(&db, &bid, "G", Privacy::Public).await;
        seed_edge(&db, &bid, &r, &c, RelationType::ParentOf).await;
        seed_edge(&db, &bid, &c, &g, RelationType::ParentOf).await;

        let tree = build_nested_tree(&db, &r, None, 2, true).await.unwrap();
        assert_eq!(tree.person.id, r);
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].person.id, c);
        assert_eq!(tree.children[0].children.len(), 1);
        assert_eq!(tree.children[0].children[0].person.id, g);
        assert!(tree.children[0].children[0].children.is_empty());
        assert!(tree.parents.is_empty());
    }

    #[tokio::test]
    async fn test_depth_bound_leaves_have_empty_arrays() {
        let (db, _tmp) = test_db().await;
        let (_uid, bid) = seed_branch(&db).await;
        let r = seed_person(&db, &bid, "R", Privacy::Public).await;
        let c = seed_person(&db, &bid, "C", Privacy::Public).await;
        let g = seed_person(&db, &bid, "G", Privacy::Public).await;
        seed_edge(&db, &bid, &r, &c, RelationType::ParentOf).await;
        seed_edge(&db, &bid, &c, &g, RelationType::ParentOf).await;

        let tree = build_nested_tree(&db, &r, None, 1, true).await.unwrap();
        assert_eq!(tree.children.len(), 1);
        assert!(
            tree.children[0].children.is_empty(),
            "grandchild is beyond the depth bound"
        );
    }

    #[tokio::test]
    async fn test_ancestors_and_descendants_merge_at_root() {
        let (db, _tmp) = test_db().await;
        let (_uid, bid) = seed_branch(&db).await;
        let parent = seed_person(&db, &bid, "Parent", Privacy::Public).await;
        let me = seed_person(&db, &bid, "Me", Privacy::Public).await;
        let kid = seed_person(&db, &bid, "Kid", Privacy::Public).await;
        seed_edge(&db, &bid, &parent, &me, RelationType::ParentOf).await;
        seed_edge(&db, &bid, &me, &kid, RelationType::ParentOf).await;

        let tree = build_nested_tree(&db, &me, None, 3, true).await.unwrap();
        assert_eq!(tree.parents.len(), 1);
        assert_eq!(tree.parents[0].person.id, parent);
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].person.id, kid);
    }

    #[tokio::test]
    async fn test_root_not_found() {
        let (db, _tmp) = test_db().await;
        let (_uid, _bid) = seed_branch(&db).await;
        let err = build_nested_tree(&db, "ghost", None, 3, true)
            .await
            .unwrap_err();
        assert!(matches!(err, KintreeError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_sensitive_root_forbidden_for_outsider() {
        let (db, _tmp) = test_db().await;
        let (_uid, bid) = seed_branch(&db).await;
        let r = seed_person(&db, &bid, "R", Privacy::Sensitive).await;

        let outsider = member("outsider");
        let err = build_nested_tree(&db, &r, Some(&outsider), 3, true)
            .await
            .unwrap_err();
        assert!(matches!(err, KintreeError::Forbidden(_)));

        // Admin still gets through.
        build_nested_tree(&db, &r, Some(&admin()), 3, true)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_hidden_node_prunes_orphaned_subtree() {
        let (db, _tmp) = test_db().await;
        let (_uid, bid) = seed_branch(&db).await;
        let r = seed_person(&db, &bid, "R", Privacy::Public).await;
        let hidden = seed_person(&db, &bid, "Hidden", Privacy::Sensitive).await;
        let g = seed_person(&db, &bid, "G", Privacy::Public).await;
        seed_edge(&db, &bid, &r, &hidden, RelationType::ParentOf).await;
        seed_edge(&db, &bid, &hidden, &g, RelationType::ParentOf).await;

        let outsider = member("outsider");
        let tree = build_nested_tree(&db, &r, Some(&outsider), 3, true)
            .await
            .unwrap();
        let ids = collect_ids(&tree);
        assert!(!ids.contains(&hidden), "hidden node leaked");
        assert!(
            !ids.contains(&g),
            "grandchild reachable only through a hidden node must be absent"
        );

        // The same tree through an admin shows the whole line.
        let full = build_nested_tree(&db, &r, Some(&admin()), 3, true)
            .await
            .unwrap();
        let ids = collect_ids(&full);
        assert!(ids.contains(&hidden));
        assert!(ids.contains(&g));
    }

    #[tokio::test]
    async fn test_hidden_node_visible_via_other_path() {
        let (db, _tmp) = test_db().await;
        let (_uid, bid) = seed_branch(&db).await;
        let r = seed_person(&db, &bid, "R", Privacy::Public).await;
        let hidden = seed_person(&db, &bid, "Hidden", Privacy::Sensitive).await;
        let open = seed_person(&db, &bid, "Open", Privacy::Public).await;
        let g = seed_person(&db, &bid, "G", Privacy::Public).await;
        seed_edge(&db, &bid, &r, &hidden, RelationType::ParentOf).await;
        seed_edge(&db, &bid, &r, &open, RelationType::ParentOf).await;
        seed_edge(&db, &bid, &hidden, &g, RelationType::ParentOf).await;
        seed_edge(&db, &bid, &open, &g, RelationType::ParentOf).await;

        let outsider = member("outsider");
        let tree = build_nested_tree(&db, &r, Some(&outsider), 3, true)
            .await
            .unwrap();
        let ids = collect_ids(&tree);
        assert!(!ids.contains(&hidden));
        assert!(ids.contains(&g), "g is still reachable through the open child");
    }

    #[tokio::test]
    async fn test_spouse_toggle_and_symmetry() {
        let (db, _tmp) = test_db().await;
        let (_uid, bid) = seed_branch(&db).await;
        let r = seed_person(&db, &bid, "R", Privacy::Public).await;
        let c = seed_person(&db, &bid, "C", Privacy::Public).await;
        let s = seed_person(&db, &bid, "S", Privacy::Public).await;
        seed_edge(&db, &bid, &r, &c, RelationType::ParentOf).await;
        seed_edge(&db, &bid, &r, &s, RelationType::ParentOf).await;
        seed_edge(&db, &bid, &c, &s, RelationType::SpouseOf).await;

        let without = build_nested_tree(&db, &r, None, 2, false).await.unwrap();
        assert!(without.spouses.is_empty());
        assert!(without.children.iter().all(|c| c.spouses.is_empty()));

        let with = build_nested_tree(&db, &r, None, 2, true).await.unwrap();
        let c_node = with.children.iter().find(|n| n.person.id == c).unwrap();
        let s_node = with.children.iter().find(|n| n.person.id == s).unwrap();
        assert_eq!(c_node.spouses.len(), 1);
        assert_eq!(c_node.spouses[0].person.id, s);
        assert_eq!(s_node.spouses.len(), 1);
        assert_eq!(s_node.spouses[0].person.id, c, "spouse links must be symmetric");
    }

    #[tokio::test]
    async fn test_off_set_spouse_rendered_on_root() {
        let (db, _tmp) = test_db().await;
        let (_uid, bid) = seed_branch(&db).await;
        let r = seed_person(&db, &bid, "R", Privacy::Public).await;
        let s = seed_person(&db, &bid, "S", Privacy::Public).await;
        seed_edge(&db, &bid, &s, &r, RelationType::SpouseOf).await;

        let tree = build_nested_tree(&db, &r, None, 3, true).await.unwrap();
        assert_eq!(tree.spouses.len(), 1);
        assert_eq!(tree.spouses[0].person.id, s);
    }

    #[tokio::test]
    async fn test_hidden_spouse_never_leaks() {
        let (db, _tmp) = test_db().await;
        let (_uid, bid) = seed_branch(&db).await;
        let r = seed_person(&db, &bid, "R", Privacy::Public).await;
        let s = seed_person(&db, &bid, "S", Privacy::Sensitive).await;
        seed_edge(&db, &bid, &r, &s, RelationType::SpouseOf).await;

        let outsider = member("outsider");
        let tree = build_nested_tree(&db, &r, Some(&outsider), 3, true)
            .await
            .unwrap();
        assert!(tree.spouses.is_empty());
    }

    #[tokio::test]
    async fn test_true_cycle_stays_finite() {
        let (db, _tmp) = test_db().await;
        let (_uid, bid) = seed_branch(&db).await;
        let a = seed_person(&db, &bid, "A", Privacy::Public).await;
        let b = seed_person(&db, &bid, "B", Privacy::Public).await;
        seed_edge(&db, &bid, &a, &b, RelationType::ParentOf).await;
        seed_edge(&db, &bid, &b, &a, RelationType::ParentOf).await;

        let tree = build_nested_tree(&db, &a, None, 10, true).await.unwrap();
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].person.id, b);
        // A is on the recursion path; it must not reappear under B.
        assert!(tree.children[0].children.is_empty());
        // The same applies upward: A's parents chain through B then stops.
        assert_eq!(tree.parents.len(), 1);
        assert!(tree.parents[0].parents.is_empty());
    }

    #[tokio::test]
    async fn test_diamond_shared_grandchild_appears_twice() {
        let (db, _tmp) = test_db().await;
        let (_uid, bid) = seed_branch(&db).await;
        let g = seed_person(&db, &bid, "G", Privacy::Public).await;
        let a = seed_person(&db, &bid, "A", Privacy::Public).await;
        let b = seed_person(&db, &bid, "B", Privacy::Public).await;
        let d = seed_person(&db, &bid, "D", Privacy::Public).await;
        seed_edge(&db, &bid, &g, &a, RelationType::ParentOf).await;
        seed_edge(&db, &bid, &g, &b, RelationType::ParentOf).await;
        seed_edge(&db, &bid, &a, &d, RelationType::ParentOf).await;
        seed_edge(&db, &bid, &b, &d, RelationType::ParentOf).await;

        let tree = build_nested_tree(&db, &g, None, 3, true).await.unwrap();
        let under_a = tree.children.iter().find(|n| n.person.id == a).unwrap();
        let under_b = tree.children.iter().find(|n| n.person.id == b).unwrap();
        assert_eq!(under_a.children[0].person.id, d);
        assert_eq!(under_b.children[0].person.id, d, "convergent node appears in both branches");
    }

    #[tokio::test]
    async fn test_depth_monotonicity() {
        let (db, _tmp) = test_db().await;
        let (_uid, bid) = seed_branch(&db).await;
        let r = seed_person(&db, &bid, "R", Privacy::Public).await;
        let c = seed_person(&db, &bid, "C", Privacy::Public).await;
        let g = seed_person(&db, &bid, "G", Privacy::Public).await;
        seed_edge(&db, &bid, &r, &c, RelationType::ParentOf).await;
        seed_edge(&db, &bid, &c, &g, RelationType::ParentOf).await;

        let mut previous: HashSet<String> = HashSet::new();
        for depth in 0..=3 {
            let tree = build_nested_tree(&db, &r, None, depth, true).await.unwrap();
            let ids = collect_ids(&tree);
            assert!(
                previous.is_subset(&ids),
                "depth {} dropped a previously included node",
                depth
            );
            previous = ids;
        }
    }

    #[tokio::test]
    async fn test_flat_matches_nested_at_depth_one() {
        let (db, _tmp) = test_db().await;
        let (_uid, bid) = seed_branch(&db).await;
        let parent = seed_person(&db, &bid, "Parent", Privacy::Public).await;
        let r = seed_person(&db, &bid, "R", Privacy::Public).await;
        let kid = seed_person(&db, &bid, "Kid", Privacy::Public).await;
        let s = seed_person(&db, &bid, "S", Privacy::Public).await;
        seed_edge(&db, &bid, &parent, &r, RelationType::ParentOf).await;
        seed_edge(&db, &bid, &r, &kid, RelationType::ParentOf).await;
        seed_edge(&db, &bid, &r, &s, RelationType::SpouseOf).await;

        let flat = build_flat_tree(&db, &r, None).await.unwrap();
        let nested = build_nested_tree(&db, &r, None, 1, true).await.unwrap();

        let flat_parents: HashSet<String> = flat.parents.iter().map(|p| p.id.clone()).collect();
        let nested_parents: HashSet<String> =
            nested.parents.iter().map(|n| n.person.id.clone()).collect();
        assert_eq!(flat_parents, nested_parents);

        let flat_children: HashSet<String> = flat.children.iter().map(|p| p.id.clone()).collect();
        let nested_children: HashSet<String> =
            nested.children.iter().map(|n| n.person.id.clone()).collect();
        assert_eq!(flat_children, nested_children);

        let flat_spouses: HashSet<String> = flat.spouses.iter().map(|p| p.id.clone()).collect();
        let nested_spouses: HashSet<String> =
            nested.spouses.iter().map(|n| n.person.id.clone()).collect();
        assert_eq!(flat_spouses, nested_spouses);
    }

    #[tokio::test]
    async fn test_flat_root_checks() {
        let (db, _tmp) = test_db().await;
        let (_uid, bid) = seed_branch(&db).await;
        let r = seed_person(&db, &bid, "R", Privacy::Sensitive).await;

        assert!(matches!(
            build_flat_tree(&db, "ghost", None).await.unwrap_err(),
            KintreeError::NotFound(_)
        ));
        assert!(matches!(
            build_flat_tree(&db, &r, None).await.unwrap_err(),
            KintreeError::Forbidden(_)
        ));
    }

    #[tokio::test]
    async fn test_banned_actor_is_anonymous() {
        let (db, _tmp) = test_db().await;
        let (_uid, bid) = seed_branch(&db).await;
        let r = seed_person(&db, &bid, "R", Privacy::Internal).await;

        let banned = Actor {
            id: "banned".into(),
            role: Role::Admin,
            is_banned: true,
        };
        let err = build_nested_tree(&db, &r, Some(&banned), 3, true)
            .await
            .unwrap_err();
        assert!(matches!(err, KintreeError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_legacy_ancestor_and_descendant_lists() {
        let (db, _tmp) = test_db().await;
        let (_uid, bid) = seed_branch(&db).await;
        let gp = seed_person(&db, &bid, "Grandparent", Privacy::Public).await;
        let p = seed_person(&db, &bid, "Parent", Privacy::Public).await;
        let me = seed_person(&db, &bid, "Me", Privacy::Public).await;
        let kid = seed_person(&db, &bid, "Kid", Privacy::Public).await;
        seed_edge(&db, &bid, &gp, &p, RelationType::ParentOf).await;
        seed_edge(&db, &bid, &p, &me, RelationType::ParentOf).await;
        seed_edge(&db, &bid, &me, &kid, RelationType::ParentOf).await;

        let ancestors = list_ancestors(&db, &me, 5).await.unwrap();
        let ids: HashSet<String> = ancestors.iter().map(|p| p.id.clone()).collect();
        assert_eq!(ids, [gp.clone(), p.clone()].into_iter().collect());

        let shallow = list_ancestors(&db, &me, 1).await.unwrap();
        assert_eq!(shallow.len(), 1);
        assert_eq!(shallow[0].id, p);

        let descendants = list_descendants(&db, &me, 5).await.unwrap();
        assert_eq!(descendants.len(), 1);
        assert_eq!(descendants[0].id, kid);

        assert!(matches!(
            list_ancestors(&db, "ghost", 5).await.unwrap_err(),
            KintreeError::NotFound(_)
        ));
    }
}

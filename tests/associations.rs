use beanbag::bean::Value;
use beanbag::engine::Engine;

#[test]
fn linking_persists_transients_and_is_symmetric() {
    let mut engine = Engine::open_in_memory().expect("engine");
    let mut group = engine.dispense("group");
    group.set_prop("title", "admins");
    let mut user = engine.dispense("user");
    user.set_prop("name", "Ann");

    engine.link(&mut group, &mut user).expect("link");
    assert!(user.id > 0);
    assert!(group.id > 0);
    assert!(engine.table_exists("group_user").expect("exists"));

    let groups = engine.related(&user, "group").expect("related");
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].prop("title"), Some(&Value::Text("admins".into())));
    let users = engine.related(&group, "user").expect("related");
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].prop("name"), Some(&Value::Text("Ann".into())));
}

#[test]
fn link_order_lands_in_the_same_junction() {
    let mut engine = Engine::open_in_memory().expect("engine");
    let mut group = engine.dispense("group");
    let mut user = engine.dispense("user");
    engine.link(&mut user, &mut group).expect("link");
    // reversed argument order targets the same sorted table, so this is a
    // duplicate and must not add an edge
    engine.link(&mut group, &mut user).expect("link again");
    assert_eq!(engine.num_related("user", &group).expect("count"), 1);
    assert_eq!(engine.num_related("group", &user).expect("count"), 1);
}

#[test]
fn break_link_removes_one_edge_only() {
    let mut engine = Engine::open_in_memory().expect("engine");
    let mut group = engine.dispense("group");
    let mut ann = engine.dispense("user");
    let mut bob = engine.dispense("user");
    engine.link(&mut group, &mut ann).expect("link");
    engine.link(&mut group, &mut bob).expect("link");

    engine.break_link(&group, &ann).expect("break");
    assert_eq!(engine.num_related("user", &group).expect("count"), 1);
    // breaking an absent link is a no-op
    engine.break_link(&group, &ann).expect("break twice");
    let left = engine.related(&group, "user").expect("related");
    assert_eq!(left[0].id, bob.id);
}

#[test]
fn unrelated_types_count_zero() {
    let mut engine = Engine::open_in_memory().expect("engine");
    let mut user = engine.dispense("user");
    user.set_prop("name", "Ann");
    engine.set(&mut user).expect("set");
    assert_eq!(engine.num_related("group", &user).expect("count"), 0);
    assert!(engine.related(&user, "group").expect("related").is_empty());
}

#[test]
fn self_association_shares_one_table() {
    let mut engine = Engine::open_in_memory().expect("engine");
    let mut ann = engine.dispense("user");
    ann.set_prop("name", "Ann");
    let mut bob = engine.dispense("user");
    bob.set_prop("name", "Bob");

    engine.link(&mut ann, &mut bob).expect("link");
    assert!(engine.table_exists("user_user").expect("exists"));
    // the mirrored orientation counts as the same pair
    engine.link(&mut bob, &mut ann).expect("link mirrored");
    assert_eq!(engine.num_related("user", &ann).expect("count"), 1);

    let partners = engine.related(&ann, "user").expect("related");
    assert_eq!(partners.len(), 1);
    assert_eq!(partners[0].id, bob.id);
    let partners = engine.related(&bob, "user").expect("related");
    assert_eq!(partners.len(), 1);
    assert_eq!(partners[0].id, ann.id);

    engine.break_link(&bob, &ann).expect("break");
    assert_eq!(engine.num_related("user", &ann).expect("count"), 0);
}

#[test]
fn delete_all_assoc_clears_every_junction() {
    let mut engine = Engine::open_in_memory().expect("engine");
    let mut group = engine.dispense("group");
    let mut book = engine.dispense("book");
    let mut user = engine.dispense("user");
    engine.link(&mut group, &mut user).expect("link");
    engine.link(&mut book, &mut user).expect("link");

    engine.delete_all_assoc(&user).expect("delete");
    assert_eq!(engine.num_related("group", &user).expect("count"), 0);
    assert_eq!(engine.num_related("book", &user).expect("count"), 0);
    // the partners themselves are untouched
    assert!(engine.exists("group", group.id).expect("exists"));
    assert!(engine.exists("book", book.id).expect("exists"));
}

#[test]
fn delete_all_assoc_type_is_scoped() {
    let mut engine = Engine::open_in_memory().expect("engine");
    let mut group = engine.dispense("group");
    let mut book = engine.dispense("book");
    let mut user = engine.dispense("user");
    engine.link(&mut group, &mut user).expect("link");
    engine.link(&mut book, &mut user).expect("link");

    engine.delete_all_assoc_type("group", &user).expect("delete");
    assert_eq!(engine.num_related("group", &user).expect("count"), 0);
    assert_eq!(engine.num_related("book", &user).expect("count"), 1);
}

#[test]
fn type_pairs_shadowing_internal_names_link_cleanly() {
    let mut engine = Engine::open_in_memory().expect("engine");
    // "bb"/"registry" and "bb"/"lock" are valid types whose junctions sit
    // right next to the engine's own tables in the namespace
    let mut bb = engine.dispense("bb");
    let mut registry = engine.dispense("registry");
    engine.link(&mut bb, &mut registry).expect("link");
    assert!(engine.table_exists("bb_registry").expect("exists"));
    assert_eq!(engine.num_related("registry", &bb).expect("count"), 1);

    let mut lock = engine.dispense("lock");
    engine.link(&mut bb, &mut lock).expect("link");
    assert_eq!(engine.num_related("lock", &bb).expect("count"), 1);

    // the registry kept tracking through all of it
    let tables = engine.list_tables(false).expect("tables");
    for table in ["bb", "bb_lock", "bb_registry", "lock", "registry"] {
        assert!(tables.contains(&table.to_string()), "missing {table}");
    }
    // and the lock protocol is unharmed
    let mut user = engine.dispense("user");
    user.set_prop("name", "Ann");
    engine.set(&mut user).expect("set");
    engine.open_bean(&user, true).expect("lock");
}

#[test]
fn a_self_loop_counts_as_one_association() {
    let mut engine = Engine::open_in_memory().expect("engine");
    let mut ann = engine.dispense("user");
    ann.set_prop("name", "Ann");
    engine.set(&mut ann).expect("set");

    let mut same = ann.clone();
    engine.link(&mut ann, &mut same).expect("link");
    assert_eq!(engine.num_related("user", &ann).expect("count"), 1);
    // linking the loop again is still a duplicate
    engine.link(&mut ann, &mut same).expect("link twice");
    assert_eq!(engine.num_related("user", &ann).expect("count"), 1);

    let partners = engine.related(&ann, "user").expect("related");
    assert_eq!(partners.len(), 1);
    assert_eq!(partners[0].id, ann.id);

    engine.break_link(&ann, &same).expect("break");
    assert_eq!(engine.num_related("user", &ann).expect("count"), 0);
}

#[test]
fn trashing_a_bean_cascades_through_junctions() {
    let mut engine = Engine::open_in_memory().expect("engine");
    let mut group = engine.dispense("group");
    let mut user = engine.dispense("user");
    engine.link(&mut group, &mut user).expect("link");

    engine.trash(&user).expect("trash");
    assert!(engine.related(&group, "user").expect("related").is_empty());
    assert_eq!(engine.num_related("user", &group).expect("count"), 0);
}

use beanbag::bean::Value;
use beanbag::engine::Engine;
use beanbag::store::Stat;

#[test]
fn first_bean_gets_id_one_and_round_trips() {
    let mut engine = Engine::open_in_memory().expect("engine");
    let mut user = engine.dispense("user");
    user.set_prop("name", "Ann");
    user.set_prop("age", 30i64);

    let report = engine.set(&mut user).expect("set");
    assert_eq!(report.id, 1);
    assert_eq!(user.id, 1);
    assert!(report.skipped.is_empty());

    let back = engine.get("user", 1).expect("get").expect("bean");
    assert_eq!(back.prop("name"), Some(&Value::Text("Ann".into())));
    assert_eq!(back.prop("age"), Some(&Value::Int(30)));
}

#[test]
fn updates_keep_the_id_and_overwrite_in_place() {
    let mut engine = Engine::open_in_memory().expect("engine");
    let mut user = engine.dispense("user");
    user.set_prop("name", "Ann");
    engine.set(&mut user).expect("set");
    let id = user.id;

    user.set_prop("name", "Beth");
    let report = engine.set(&mut user).expect("update");
    assert_eq!(report.id, id);
    assert_eq!(engine.count_of("user").expect("count"), 1);

    let back = engine.get("user", id).expect("get").expect("bean");
    assert_eq!(back.prop("name"), Some(&Value::Text("Beth".into())));
}

#[test]
fn getting_the_unknown_is_none_not_an_error() {
    let mut engine = Engine::open_in_memory().expect("engine");
    assert!(engine.get("ghost", 1).expect("get").is_none());
    assert!(!engine.exists("ghost", 1).expect("exists"));
    assert_eq!(engine.count_of("ghost").expect("count"), 0);

    let mut user = engine.dispense("user");
    user.set_prop("name", "Ann");
    engine.set(&mut user).expect("set");
    assert!(engine.get("user", 99).expect("get").is_none());
}

#[test]
fn trash_is_idempotent() {
    let mut engine = Engine::open_in_memory().expect("engine");
    let mut user = engine.dispense("user");
    user.set_prop("name", "Ann");
    engine.set(&mut user).expect("set");

    engine.trash(&user).expect("trash");
    assert!(engine.get("user", user.id).expect("get").is_none());
    // trashing again, or trashing a never-stored bean, changes nothing
    engine.trash(&user).expect("trash twice");
    let transient = engine.dispense("user");
    engine.trash(&transient).expect("trash transient");
}

#[test]
fn aggregates_over_a_property() {
    let mut engine = Engine::open_in_memory().expect("engine");
    for age in [20i64, 30, 40] {
        let mut user = engine.dispense("user");
        user.set_prop("age", age);
        engine.set(&mut user).expect("set");
    }
    assert_eq!(engine.stat_of("user", "age", Stat::Sum).expect("sum"), 90.0);
    assert_eq!(engine.stat_of("user", "age", Stat::Avg).expect("avg"), 30.0);
    assert_eq!(engine.stat_of("user", "age", Stat::Min).expect("min"), 20.0);
    assert_eq!(engine.stat_of("user", "age", Stat::Max).expect("max"), 40.0);
    // absent table or column degrades to zero
    assert_eq!(engine.stat_of("ghost", "age", Stat::Sum).expect("sum"), 0.0);
    assert_eq!(engine.stat_of("user", "shoe", Stat::Sum).expect("sum"), 0.0);
}

#[test]
fn load_all_fetches_in_one_round_trip() {
    let mut engine = Engine::open_in_memory().expect("engine");
    let mut ids = Vec::new();
    for name in ["Ann", "Bob", "Cyd"] {
        let mut user = engine.dispense("user");
        user.set_prop("name", name);
        ids.push(engine.set(&mut user).expect("set").id);
    }
    let batch = engine
        .load_all("user", &[ids[2], ids[0], 99])
        .expect("load_all");
    assert_eq!(batch.len(), 2);
    // unknown ids are absent, results come back in id order
    assert_eq!(batch[0].prop("name"), Some(&Value::Text("Ann".into())));
    assert_eq!(batch[1].prop("name"), Some(&Value::Text("Cyd".into())));
    assert!(engine.load_all("user", &[]).expect("load_all").is_empty());
}

#[test]
fn trash_all_empties_the_type_but_keeps_the_table() {
    let mut engine = Engine::open_in_memory().expect("engine");
    let mut user = engine.dispense("user");
    user.set_prop("name", "Ann");
    engine.set(&mut user).expect("set");

    engine.trash_all("user").expect("trash_all");
    assert_eq!(engine.count_of("user").expect("count"), 0);
    assert!(engine.table_exists("user").expect("exists"));

    // ids keep growing after a wipe (autoincrement)
    let mut again = engine.dispense("user");
    again.set_prop("name", "Bob");
    assert!(engine.set(&mut again).expect("set").id > user.id);
}

#[test]
fn dirty_names_are_rejected_before_any_write() {
    let mut engine = Engine::open_in_memory().expect("engine");
    let mut bad = engine.dispense("user account");
    bad.set_prop("name", "Ann");
    assert!(engine.set(&mut bad).is_err());

    let mut reserved = engine.dispense("user");
    reserved.set_prop("id", 7i64);
    assert!(engine.set(&mut reserved).is_err());
    assert!(!engine.table_exists("user").expect("exists"));
}

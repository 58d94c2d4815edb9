use mapcss_conditions::model::{ElementKind, Member, Node, Relation, Tags, Way};
use mapcss_conditions::{Condition, ConditionError, Context, Mode, Op, Primitive};

fn tags(pairs: &[(&str, &str)]) -> Tags {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn way(id: i64, pairs: &[(&str, &str)]) -> Way {
    Way {
        id,
        tags: tags(pairs),
        ..Default::default()
    }
}

#[test]
fn highway_equality() {
    let residential = way(1, &[("highway", "residential")]);
    let ctx = Context::new().with_subject(&residential);

    let eq = Condition::key_value("highway", "residential", Op::Eq, Mode::Entity).unwrap();
    let other = Condition::key_value("highway", "primary", Op::Eq, Mode::Entity).unwrap();
    assert!(eq.applies(&ctx));
    assert!(!other.applies(&ctx));
}

#[test]
fn one_of_is_case_sensitive() {
    let w = way(1, &[("x", "a;b;c")]);
    let ctx = Context::new().with_subject(&w);
    let b = Condition::key_value("x", "b", Op::OneOf, Mode::Entity).unwrap();
    let upper = Condition::key_value("x", "B", Op::OneOf, Mode::Entity).unwrap();
    assert!(b.applies(&ctx));
    assert!(!upper.applies(&ctx));
}

#[test]
fn link_context_membership() {
    let member = way(7, &[("building", "yes")]);
    let relation = Relation {
        id: 1,
        tags: tags(&[("type", "multipolygon")]),
        members: vec![Member::new(ElementKind::Way, 7, "outer")],
        ..Default::default()
    };
    let ctx = Context::new()
        .with_subject(&member)
        .with_parent(&relation)
        .with_index(0)
        .with_mode(Mode::Link);

    let outer = Condition::key("outer", false, false, Mode::Link).unwrap();
    let not_outer = Condition::key("outer", true, false, Mode::Link).unwrap();
    let first = Condition::key_value("index", "1", Op::Eq, Mode::Link).unwrap();
    assert!(outer.applies(&ctx));
    assert!(!not_outer.applies(&ctx));
    assert!(first.applies(&ctx));
}

#[test]
fn construction_errors_name_the_clause() {
    let err = Condition::key_value("foo", "bar", Op::Eq, Mode::Link).unwrap_err();
    assert_eq!(
        err,
        ConditionError::UnsupportedLinkKey {
            key: "foo".to_string()
        }
    );
    assert!(err.to_string().contains("'foo'"));

    let err = Condition::key("x", false, true, Mode::Link).unwrap_err();
    assert!(matches!(err, ConditionError::TruthyTestInLink { .. }));

    let err = Condition::key_value("maxspeed", "fast", Op::Less, Mode::Entity).unwrap_err();
    assert!(err.to_string().contains("'<'"), "{err}");
}

#[test]
fn unknown_pseudo_class_matches_every_kind() {
    let node = Node {
        id: 1,
        ..Default::default()
    };
    let w = way(2, &[]);
    let relation = Relation::default();
    let cond = Condition::pseudo_class("no-such-id", false, Mode::Entity);
    let subjects: [&dyn Primitive; 3] = [&node, &w, &relation];
    for subject in subjects {
        assert!(cond.applies(&Context::new().with_subject(subject)));
    }
}

#[test]
fn concurrent_evaluation_matches_sequential() {
    let ways: Vec<Way> = (0..64)
        .map(|i| {
            let lanes = (i % 5).to_string();
            let highway = if i % 2 == 0 { "primary" } else { "service" };
            way(i, &[("highway", highway), ("lanes", lanes.as_str())])
        })
        .collect();

    let conditions = vec![
        Condition::key_value("lanes", "2", Op::GreaterOrEqual, Mode::Entity).unwrap(),
        Condition::key_value("highway", "^pri", Op::Regex, Mode::Entity).unwrap(),
        Condition::expression("tags.highway == 'service'", Mode::Entity).unwrap(),
    ];

    let sequential: Vec<Vec<bool>> = ways
        .iter()
        .map(|w| {
            let ctx = Context::new().with_subject(w);
            conditions.iter().map(|c| c.applies(&ctx)).collect()
        })
        .collect();

    let concurrent: Vec<Vec<bool>> = std::thread::scope(|scope| {
        let handles: Vec<_> = ways
            .iter()
            .map(|w| {
                let conditions = &conditions;
                scope.spawn(move || {
                    let ctx = Context::new().with_subject(w);
                    conditions.iter().map(|c| c.applies(&ctx)).collect::<Vec<bool>>()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(sequential, concurrent);
    assert!(sequential.iter().any(|row| row[0]));
    assert!(sequential.iter().any(|row| !row[0]));
}

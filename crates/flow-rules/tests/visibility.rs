use pretty_assertions::assert_eq;
use serde_json::json;

use flow_rules::{
    AnswerBag, Flow, Question, VisibilityMap, VisibilityState, evaluate_visibility,
    resolve_visibility,
};

fn fixture(name: &str) -> Flow {
    let raw = match name {
        "raid_signup" => include_str!("../tests/fixtures/raid_signup.json"),
        "legacy_signup" => include_str!("../tests/fixtures/legacy_signup.json"),
        _ => panic!("unknown fixture {}", name),
    };
    serde_json::from_str(raw).expect("deserialize flow")
}

fn states(map: &VisibilityMap) -> Vec<(&str, &str)> {
    map.iter()
        .map(|(qid, state)| (qid.as_str(), state.state().as_str()))
        .collect()
}

fn permutations(items: &[&'static str]) -> Vec<Vec<&'static str>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut out = Vec::new();
    for (index, item) in items.iter().enumerate() {
        let mut rest = items.to_vec();
        rest.remove(index);
        for mut tail in permutations(&rest) {
            tail.insert(0, item);
            out.push(tail);
        }
    }
    out
}

#[test]
fn fixture_resolves_for_a_tank() {
    let flow = fixture("raid_signup");
    let answers = AnswerBag::from_json(&json!({
        "role": { "value": "tank", "label": "Tank" },
        "power": "5200000",
    }));
    let map = evaluate_visibility(&flow.questions, &answers);
    assert_eq!(
        states(&map),
        vec![
            ("comments", "optional"),
            ("gear_score", "skip"),
            ("officer", "show"),
            ("power", "show"),
            ("role", "show"),
            ("rotation", "optional"),
            ("tank_notes", "show"),
        ]
    );
}

#[test]
fn evaluation_is_idempotent() {
    let flow = fixture("raid_signup");
    let answers = AnswerBag::from_json(&json!({ "role": "dps", "power": "5000" }));
    let first = evaluate_visibility(&flow.questions, &answers);
    let second = evaluate_visibility(&flow.questions, &answers);
    assert_eq!(first, second);
    assert_eq!(first["officer"].state(), VisibilityState::Skip);
}

#[test]
fn skip_survives_every_directive_order() {
    let directives = ["skip_if(true)", "show_if(true)", "optional_if(true)", "require_if(true)"];
    for order in permutations(&directives) {
        let questions = vec![
            Question::new("target", "1")
                .required(true)
                .with_visibility_rules(order.join("\n")),
        ];
        let map = evaluate_visibility(&questions, &AnswerBag::new());
        assert_eq!(map["target"].state(), VisibilityState::Skip, "order: {order:?}");
        assert!(!map["target"].required);
    }
}

#[test]
fn equality_against_a_scalar_answer() {
    let answers = AnswerBag::from_json(&json!({ "q1": "Tank" }));
    let flow = |rules: &str| {
        vec![
            Question::new("q1", "1"),
            Question::new("q2", "2").required(true).with_visibility_rules(rules),
        ]
    };

    let map = evaluate_visibility(&flow("show_if(q1 = \"Tank\")"), &answers);
    assert_eq!(map["q2"].state(), VisibilityState::Show);

    let map = evaluate_visibility(&flow("skip_if(true)\nshow_if(q1 = \"Healer\")"), &answers);
    assert_eq!(map["q2"].state(), VisibilityState::Skip);

    let map = evaluate_visibility(&flow("show_if(q1 = \"Healer\")"), &answers);
    assert_eq!(map["q2"].state(), VisibilityState::Show);
}

#[test]
fn in_operator_matches_list_members() {
    let questions = vec![
        Question::new("role", "1"),
        Question::new("gear_score", "2")
            .required(true)
            .with_visibility_rules("skip_if(role in [\"tank\",\"heal\"])"),
    ];
    let heal = AnswerBag::from_json(&json!({ "role": "heal" }));
    assert_eq!(
        evaluate_visibility(&questions, &heal)["gear_score"].state(),
        VisibilityState::Skip
    );
    let dps = AnswerBag::from_json(&json!({ "role": "dps" }));
    assert_eq!(
        evaluate_visibility(&questions, &dps)["gear_score"].state(),
        VisibilityState::Show
    );
}

#[test]
fn unit_suffixes_are_not_numeric() {
    let questions = vec![
        Question::new("power", "1"),
        Question::new("officer", "2").with_visibility_rules("require_if(power > 1000000)"),
    ];
    let suffixed = AnswerBag::from_json(&json!({ "power": "5.2M" }));
    assert_eq!(
        evaluate_visibility(&questions, &suffixed)["officer"].state(),
        VisibilityState::Optional
    );
    let raw = AnswerBag::from_json(&json!({ "power": "5200000" }));
    assert_eq!(
        evaluate_visibility(&questions, &raw)["officer"].state(),
        VisibilityState::Show
    );
}

#[test]
fn not_equal_is_no_pair_equal_not_set_inequality() {
    let questions = vec![
        Question::new("roles", "1"),
        Question::new("eq", "2")
            .required(true)
            .with_visibility_rules("skip_if(roles = 'heal')"),
        Question::new("ne", "3")
            .required(true)
            .with_visibility_rules("skip_if(roles != 'heal')"),
    ];
    let multi = AnswerBag::from_json(&json!({ "roles": { "values": ["tank", "heal"] } }));
    let map = evaluate_visibility(&questions, &multi);
    assert_eq!(map["eq"].state(), VisibilityState::Skip);
    assert_eq!(map["ne"].state(), VisibilityState::Show);

    let unanswered = evaluate_visibility(&questions, &AnswerBag::new());
    assert_eq!(unanswered["eq"].state(), VisibilityState::Show);
    assert_eq!(unanswered["ne"].state(), VisibilityState::Skip);
}

#[test]
fn unknown_targets_and_broken_rows_do_not_block_others() {
    let questions = vec![
        Question::new("a", "1")
            .required(true)
            .with_visibility_rules("skip_if(true, target=ghost)\noptional_if(true, target=b)"),
        Question::new("b", "2").required(true),
        Question::new("c", "3")
            .required(true)
            .with_visibility_rules("skip_if(role in 'tank')"),
        Question::new("d", "4")
            .required(true)
            .with_visibility_rules("skip_if(int(missing) > 1)\noptional_if(true)"),
    ];
    let map = evaluate_visibility(&questions, &AnswerBag::new());
    assert_eq!(
        states(&map),
        vec![("a", "show"), ("b", "optional"), ("c", "show"), ("d", "optional")]
    );
}

#[test]
fn single_pass_limit_matches_settled_result() {
    let flow = fixture("raid_signup");
    let answers = AnswerBag::from_json(&json!({ "role": "heal" }));
    let single = resolve_visibility(&flow.questions, &answers, None, 1);
    assert_eq!(single, evaluate_visibility(&flow.questions, &answers));
}

#[test]
fn deeply_nested_rules_fail_open() {
    let nested = format!("skip_if({}true{})", "(".repeat(2000), ")".repeat(2000));
    let nots = format!("skip_if({}true)", "not ".repeat(12_000));
    let questions = vec![
        Question::new("nested", "1")
            .required(true)
            .with_visibility_rules(&nested),
        Question::new("nots", "2").with_visibility_rules(&nots),
        Question::new("after", "3").with_visibility_rules("skip_if(true)"),
    ];
    let map = evaluate_visibility(&questions, &AnswerBag::new());
    assert_eq!(
        states(&map),
        vec![("nested", "show"), ("nots", "optional"), ("after", "skip")]
    );
    assert!(map["nested"].required);
    assert!(!map["nots"].required);
}

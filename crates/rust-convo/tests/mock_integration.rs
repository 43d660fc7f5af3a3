//! Integration tests for sessions, batches and the `convo!` macro
//! against mock connectors.

use std::sync::Arc;

use rust_convo::mock::{
    MockConnector, MockReply, Scenario, echo_container, greeting_scenario, order_scenario,
    scenario_container,
};
use rust_convo::{
    BatchSummary, Convo, ConvoBatch, ConvoRunner, ErrorKind, Message, RunMetrics, TranscriptBus,
    convo,
};

#[tokio::test]
async fn macro_script_runs_against_greeter() {
    let script = convo! {
        name "greeting";
        me "hi";
        bot "Hello! What is your name?";
        me "bye";
        not bot "Hello! What is your name?";
    };
    assert_eq!(script.name(), "greeting");
    assert_eq!(script.len(), 4);

    let runner = ConvoRunner::default();
    let mut container = scenario_container("greeter", greeting_scenario());
    let transcript = runner.run_session(&mut container, &script).await.unwrap();

    assert_eq!(transcript.steps.len(), 4);
    assert!(!container.is_started());
}

#[tokio::test]
async fn macro_script_with_utterances_and_pause() {
    let script = convo! {{
        utterance "BYE" ["Goodbye!", "See you"];
        me "bye";
        bot "BYE";
        pause 10;
    }};
    assert_eq!(script.alternatives("BYE").len(), 2);

    let runner = ConvoRunner::default();
    let mut container = scenario_container("greeter", greeting_scenario());
    let transcript = runner.run_session(&mut container, &script).await.unwrap();
    assert_eq!(transcript.steps.len(), 3);
}

#[tokio::test]
async fn session_refusing_start_publishes_empty_failure() {
    let bus = Arc::new(TranscriptBus::new());
    let metrics = Arc::new(RunMetrics::new());
    metrics.attach(&bus);
    let runner = ConvoRunner::default().with_bus(bus);

    let mut container =
        scenario_container("down", Scenario::new("down").refuse_start("backend offline"));
    let convo = Convo::builder("unreachable").me("hi").build();

    let failure = runner.run_session(&mut container, &convo).await.unwrap_err();

    assert_eq!(failure.kind(), ErrorKind::Container);
    assert!(failure.transcript().is_empty());
    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.runs, 1);
    assert_eq!(snapshot.runs_failed, 1);
}

#[tokio::test]
async fn connector_failure_fails_the_step() {
    let runner = ConvoRunner::default();
    let scenario = Scenario::echo().fail_on("explode", "boom");
    let mut container = scenario_container("fragile", scenario);
    let convo = Convo::builder("explodes").me("explode").bot("explode").build();

    let failure = runner.run_session(&mut container, &convo).await.unwrap_err();

    assert_eq!(failure.kind(), ErrorKind::Container);
    assert!(failure.to_string().contains("boom"));
}

#[tokio::test]
async fn delayed_replies_arrive_in_order() {
    let scenario = Scenario::new("slow").respond(
        "go",
        [
            MockReply::text("first").delay_ms(20),
            MockReply::text("second").delay_ms(5),
        ],
    );
    let runner = ConvoRunner::default();
    let mut container = scenario_container("slow", scenario);
    let convo = Convo::builder("slow")
        .me("go")
        .bot("first")
        .bot("second")
        .build();

    runner.run_session(&mut container, &convo).await.unwrap();
}

#[tokio::test]
async fn unsolicited_greeting_is_expected_first() {
    let scenario = Scenario::new("welcome").greeting("Welcome!").on("hi", "Hello");
    let runner = ConvoRunner::default();
    let mut container = scenario_container("welcome", scenario);
    let convo = Convo::builder("welcome")
        .bot("Welcome!")
        .me("hi")
        .bot("Hello")
        .build();

    runner.run_session(&mut container, &convo).await.unwrap();
}

#[tokio::test]
async fn pushed_message_is_received() {
    let runner = ConvoRunner::default();
    let mut container = echo_container("push");
    container.start().await.unwrap();
    assert!(container.connector().push(Message::bot("proactive")));

    let convo = Convo::builder("push").bot("proactive").build();
    runner.run(&mut container, &convo).await.unwrap();
}

#[tokio::test]
async fn batch_runs_are_independent() {
    let bus = Arc::new(TranscriptBus::new());
    let metrics = Arc::new(RunMetrics::new());
    metrics.attach(&bus);
    let runner = ConvoRunner::default().with_bus(bus);

    let order = Arc::new(
        Convo::builder("order")
            .me("I want a pizza")
            .bot("Your order number is $order")
            .me("status of $order")
            .bot("Order $order is on its way")
            .build(),
    );

    let mut batch = ConvoBatch::new();
    for number in ["100", "200", "300"] {
        batch.add(
            number,
            scenario_container(number, order_scenario(number)),
            Arc::clone(&order),
        );
    }
    batch.add(
        "broken",
        scenario_container("broken", order_scenario("400")),
        Convo::builder("broken").me("I want a pizza").bot("No pizza").build(),
    );
    assert_eq!(batch.len(), 4);

    let results = batch.run(&runner).await;
    let summary = BatchSummary::of(&results);

    assert_eq!(summary.passed, 3);
    assert_eq!(summary.failed, 1);
    assert!(!summary.all_passed());

    for result in results.iter().filter(|r| r.is_success()) {
        let transcript = result.result.as_ref().unwrap();
        assert_eq!(
            transcript.steps[2].actual_text(),
            Some(format!("status of {}", result.label).as_str())
        );
        assert_eq!(
            result.container.connector().sent_texts()[1],
            format!("status of {}", result.label)
        );
    }

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.runs, 4);
    assert_eq!(snapshot.runs_failed, 1);
    assert_eq!(snapshot.failures_by_kind.get("unmet expectation"), Some(&1));
}

#[tokio::test]
async fn echo_connector_records_sent_messages() {
    let mut container = rust_convo::Container::new("echo", MockConnector::echo());
    let runner = ConvoRunner::default();
    let convo = Convo::builder("echo").me("one").bot("one").me("two").bot("two").build();

    runner.run_session(&mut container, &convo).await.unwrap();
    assert_eq!(container.connector().sent_texts(), vec!["one", "two"]);
}

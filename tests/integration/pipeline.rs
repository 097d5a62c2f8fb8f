//! fetch → rank → render → deliver against a mocked SWIS endpoint

use pretty_assertions::assert_eq;
use topnodes::{
    Metric,
    conversation::{
        BACKEND_FAILURE_REPLY, CANCELLED_REPLY, Controller, ConversationState, INVALID_CHOICE_REPLY,
        Inbound, Keyboard, MENU_AGAIN_PROMPT,
    },
    swis::SwisClient,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::*;

const CHAT: i64 = 1001;

type TestController = Controller<SwisClient, FileRenderer, RecordingReplier>;

fn create_controller(server: &MockServer) -> TestController {
    Controller::new(
        create_swis_client(server),
        FileRenderer::new(),
        RecordingReplier::default(),
    )
}

fn bar_labels(controller: &TestController) -> Vec<Vec<(String, f64)>> {
    controller
        .renderer()
        .charts()
        .into_iter()
        .map(|chart| {
            chart
                .bars
                .into_iter()
                .map(|bar| (bar.label, bar.value))
                .collect()
        })
        .collect()
}

#[tokio::test]
async fn test_cpu_choice_charts_two_nodes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(QUERY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(create_nodes_json(&[
            ("A", Some(90.0), None),
            ("B", Some(50.0), None),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let controller = create_controller(&server);
    let next = controller
        .handle(CHAT, ConversationState::AwaitingChoice, &Inbound::parse("cpu"))
        .await
        .unwrap();

    assert_eq!(next, ConversationState::AwaitingChoice);
    assert_eq!(
        bar_labels(&controller),
        vec![vec![(String::from("A"), 90.0), (String::from("B"), 50.0)]]
    );

    let sent = controller.replier().sent();
    assert_eq!(sent.len(), 2);
    match &sent[0] {
        Sent::Photo(chat, file, Some(caption)) => {
            assert_eq!(*chat, CHAT);
            assert!(file.ends_with(Metric::Cpu.file_name()));
            assert!(caption.starts_with("Top 5 Nodos por CPU"));
        }
        other => panic!("expected a photo, got {other:?}"),
    }
    assert_eq!(
        sent[1],
        Sent::Text(CHAT, MENU_AGAIN_PROMPT.to_string(), Keyboard::metric_menu())
    );
}

#[tokio::test]
async fn test_memory_choice_keeps_top_five() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(QUERY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(create_nodes_json(&[
            ("a", Some(99.0), Some(10.0)),
            ("b", None, Some(95.5)),
            ("c", None, None),
            ("d", None, Some(70.0)),
            ("e", None, Some(70.0)),
            ("f", None, Some(88.0)),
            ("g", None, Some(12.0)),
        ])))
        .mount(&server)
        .await;

    let controller = create_controller(&server);
    let next = controller
        .handle(CHAT, ConversationState::AwaitingChoice, &Inbound::parse(" MEMORIA "))
        .await
        .unwrap();

    assert_eq!(next, ConversationState::AwaitingChoice);

    let charts = controller.renderer().charts();
    assert_eq!(charts.len(), 1);
    assert_eq!(charts[0].metric, Metric::Memory);
    assert_eq!(
        bar_labels(&controller)[0],
        vec![
            (String::from("b"), 95.5),
            (String::from("f"), 88.0),
            (String::from("d"), 70.0),
            (String::from("e"), 70.0),
            (String::from("g"), 12.0),
        ]
    );
    assert!(
        controller
            .renderer()
            .dir
            .path()
            .join(Metric::Memory.file_name())
            .exists()
    );
}

#[tokio::test]
async fn test_backend_error_terminates_conversation() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(QUERY_PATH))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let controller = create_controller(&server);
    let next = controller
        .handle(CHAT, ConversationState::AwaitingChoice, &Inbound::parse("CPU"))
        .await
        .unwrap();

    assert_eq!(next, ConversationState::Terminated);
    assert!(controller.renderer().charts().is_empty());
    assert_eq!(
        controller.replier().sent(),
        vec![Sent::Text(
            CHAT,
            BACKEND_FAILURE_REPLY.to_string(),
            Keyboard::Unchanged
        )]
    );
}

#[tokio::test]
async fn test_empty_results_terminate_without_chart() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(create_nodes_json(&[])))
        .mount(&server)
        .await;

    let controller = create_controller(&server);
    let next = controller
        .handle(CHAT, ConversationState::AwaitingChoice, &Inbound::parse("cpu"))
        .await
        .unwrap();

    assert_eq!(next, ConversationState::Terminated);
    assert!(controller.renderer().charts().is_empty());
}

#[tokio::test]
async fn test_invalid_choice_never_reaches_backend() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(create_nodes_json(&[])))
        .expect(0)
        .mount(&server)
        .await;

    let controller = create_controller(&server);
    let next = controller
        .handle(CHAT, ConversationState::AwaitingChoice, &Inbound::parse("xyz"))
        .await
        .unwrap();

    assert_eq!(next, ConversationState::AwaitingChoice);
    assert_eq!(
        controller.replier().sent(),
        vec![Sent::Text(
            CHAT,
            INVALID_CHOICE_REPLY.to_string(),
            Keyboard::Unchanged
        )]
    );
}

#[tokio::test]
async fn test_cancel_terminates() {
    let server = MockServer::start().await;

    let controller = create_controller(&server);
    let next = controller
        .handle(CHAT, ConversationState::AwaitingChoice, &Inbound::parse("/cancel"))
        .await
        .unwrap();

    assert_eq!(next, ConversationState::Terminated);
    assert_eq!(
        controller.replier().sent(),
        vec![Sent::Text(CHAT, CANCELLED_REPLY.to_string(), Keyboard::Remove)]
    );
}

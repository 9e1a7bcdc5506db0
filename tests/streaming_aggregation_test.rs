//! Streaming aggregation: builder hand-off, observer isolation and SSE decoding

use std::sync::{Arc, Mutex};

use futures::stream;
use unillm::error::LlmError;
use unillm::streaming::{
    ChatStreamEvent, StreamingChatResponseHandler, StreamingResponseBuilder, ToolCallDelta,
    consume_stream, decode_sse_stream,
};
use unillm::types::{ChatResponse, CompleteToolCall, FinishReason, PartialToolCall};
use unillm::utils::CancelHandle;

#[derive(Default)]
struct RecordingHandler {
    partials: Mutex<Vec<String>>,
    partial_tool_calls: Mutex<Vec<PartialToolCall>>,
    complete_tool_calls: Mutex<Vec<CompleteToolCall>>,
    responses: Mutex<Vec<ChatResponse>>,
    errors: Mutex<Vec<LlmError>>,
    reject_partial: Option<&'static str>,
    panic_on_tool_call: bool,
}

impl StreamingChatResponseHandler for RecordingHandler {
    fn on_partial_response(&self, partial: &str) -> Result<(), LlmError> {
        self.partials.lock().unwrap().push(partial.to_string());
        if self.reject_partial == Some(partial) {
            return Err(LlmError::HandlerError(format!("cannot render {partial:?}")));
        }
        Ok(())
    }

    fn on_partial_tool_call(&self, call: &PartialToolCall) -> Result<(), LlmError> {
        self.partial_tool_calls.lock().unwrap().push(call.clone());
        Ok(())
    }

    fn on_complete_tool_call(&self, call: &CompleteToolCall) -> Result<(), LlmError> {
        self.complete_tool_calls.lock().unwrap().push(call.clone());
        if self.panic_on_tool_call {
            panic!("tool dispatcher exploded");
        }
        Ok(())
    }

    fn on_complete_response(&self, response: &ChatResponse) -> Result<(), LlmError> {
        self.responses.lock().unwrap().push(response.clone());
        Ok(())
    }

    fn on_error(&self, error: &LlmError) -> Result<(), LlmError> {
        self.errors.lock().unwrap().push(error.clone());
        Ok(())
    }
}

fn events(items: Vec<ChatStreamEvent>) -> impl futures::Stream<Item = Result<ChatStreamEvent, LlmError>> {
    stream::iter(items.into_iter().map(Ok))
}

#[tokio::test]
async fn failing_observer_does_not_stop_the_stream() {
    let handler = RecordingHandler {
        reject_partial: Some("bad"),
        ..Default::default()
    };
    let input = events(vec![
        ChatStreamEvent::content_delta("good "),
        ChatStreamEvent::content_delta("bad"),
        ChatStreamEvent::content_delta(" after"),
        ToolCallDelta::new(0).with_id("call_1").with_name("f").into(),
        ChatStreamEvent::finish(FinishReason::Stop),
    ]);

    let response = consume_stream(input, &handler, None).await.unwrap();

    assert_eq!(
        *handler.errors.lock().unwrap(),
        vec![LlmError::HandlerError("cannot render \"bad\"".to_string())]
    );
    assert_eq!(*handler.partials.lock().unwrap(), ["good ", "bad", " after"]);
    assert_eq!(response.text(), Some("good bad after"));
    assert_eq!(handler.complete_tool_calls.lock().unwrap().len(), 1);
    assert_eq!(handler.responses.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn panicking_observer_is_reported_through_on_error() {
    let handler = RecordingHandler {
        panic_on_tool_call: true,
        ..Default::default()
    };
    let input = events(vec![
        ToolCallDelta::new(0).with_name("a").completed().into(),
        ToolCallDelta::new(1).with_name("b").completed().into(),
    ]);

    let response = consume_stream(input, &handler, None).await.unwrap();

    assert_eq!(response.tool_execution_requests.len(), 2);
    assert_eq!(handler.complete_tool_calls.lock().unwrap().len(), 2);
    let errors = handler.errors.lock().unwrap();
    assert_eq!(errors.len(), 2);
    assert!(errors
        .iter()
        .all(|e| matches!(e, LlmError::HandlerError(msg) if msg.contains("tool dispatcher exploded"))));
}

#[tokio::test]
async fn transport_error_ends_consumption() {
    let handler = RecordingHandler::default();
    let input = stream::iter(vec![
        Ok(ChatStreamEvent::content_delta("partial")),
        Err(LlmError::StreamError("connection reset".to_string())),
        Ok(ChatStreamEvent::content_delta("never seen")),
    ]);

    let result = consume_stream(input, &handler, None).await;

    assert_eq!(
        result,
        Err(LlmError::StreamError("connection reset".to_string()))
    );
    assert_eq!(*handler.partials.lock().unwrap(), ["partial"]);
    assert_eq!(handler.errors.lock().unwrap().len(), 1);
    assert!(handler.responses.lock().unwrap().is_empty());
}

#[test]
fn cancelled_consumption_is_silent() {
    let handler = RecordingHandler::default();
    let cancel = CancelHandle::new();
    cancel.cancel();

    let result = tokio_test::block_on(consume_stream(
        events(vec![ChatStreamEvent::content_delta("x")]),
        &handler,
        Some(&cancel),
    ));

    tokio_test::assert_err!(result);
    assert!(handler.partials.lock().unwrap().is_empty());
    assert!(handler.errors.lock().unwrap().is_empty());
    assert!(handler.responses.lock().unwrap().is_empty());
}

#[test]
fn deltas_can_be_handed_off_between_threads() {
    let builder = Arc::new(StreamingResponseBuilder::new());
    let fragments = ["{\"ci", "ty\": \"Os", "lo\"}"];

    let first = {
        let builder = Arc::clone(&builder);
        std::thread::spawn(move || {
            builder.apply_tool_call_delta(ToolCallDelta::new(0).with_id("call_9").with_name("weather"))
        })
    };
    first.join().unwrap();

    for fragment in fragments {
        let builder = Arc::clone(&builder);
        std::thread::spawn(move || {
            builder.apply_tool_call_delta(ToolCallDelta::new(0).with_arguments(fragment));
        })
        .join()
        .unwrap();
    }

    let completed = std::thread::spawn({
        let builder = Arc::clone(&builder);
        move || builder.complete_tool_call(0)
    })
    .join()
    .unwrap()
    .expect("call was underway");

    assert_eq!(completed.request.id.as_deref(), Some("call_9"));
    assert_eq!(completed.request.arguments, "{\"city\": \"Oslo\"}");
    assert_eq!(builder.build().tool_execution_requests, vec![completed.request]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn deltas_from_tokio_tasks() {
    let builder = Arc::new(StreamingResponseBuilder::new());
    for (i, token) in ["a", "b", "c"].into_iter().enumerate() {
        let builder = Arc::clone(&builder);
        tokio::spawn(async move {
            builder.process(ChatStreamEvent::content_delta(token));
            builder.process(ToolCallDelta::new(i as u32).with_name(token).into());
        })
        .await
        .unwrap();
    }
    let response = builder.build();
    assert_eq!(response.text(), Some("abc"));
    assert_eq!(response.tool_execution_requests.len(), 3);
}

const SSE_BODY: &str = concat!(
    "data: {\"id\":\"chatcmpl-1\",\"model\":\"gpt-4o-mini\",\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\",\"content\":\"Let me\"}}]}\n\n",
    "data: {\"id\":\"chatcmpl-1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\" check.\"}}]}\n\n",
    "data: {\"choices\":[{\"index\":0,\"delta\":{\"tool_calls\":[{\"index\":0,\"id\":\"call_a\",\"type\":\"function\",\"function\":{\"name\":\"get_weather\",\"arguments\":\"\"}}]}}]}\n\n",
    "data: {\"choices\":[{\"index\":0,\"delta\":{\"tool_calls\":[{\"index\":0,\"function\":{\"arguments\":\"{\\\"city\\\":\"}}]}}]}\n\n",
    "data: {\"choices\":[{\"index\":0,\"delta\":{\"tool_calls\":[{\"index\":0,\"function\":{\"arguments\":\"\\\"Paris\\\"}\"}}]}}]}\n\n",
    "data: {\"choices\":[{\"index\":0,\"delta\":{\"tool_calls\":[{\"index\":1,\"id\":\"call_b\",\"type\":\"function\",\"function\":{\"name\":\"get_time\",\"arguments\":\"{}\"}}]}}]}\n\n",
    "data: {\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"tool_calls\"}]}\n\n",
    "data: {\"choices\":[],\"usage\":{\"prompt_tokens\":10,\"completion_tokens\":20,\"total_tokens\":30}}\n\n",
    "data: [DONE]\n\n",
);

#[tokio::test]
async fn sse_body_is_aggregated_end_to_end() {
    let chunks: Vec<Result<Vec<u8>, std::io::Error>> = SSE_BODY
        .as_bytes()
        .chunks(7)
        .map(|chunk| Ok(chunk.to_vec()))
        .collect();
    let handler = RecordingHandler::default();

    let response = consume_stream(decode_sse_stream(stream::iter(chunks)), &handler, None)
        .await
        .unwrap();

    assert_eq!(response.id.as_deref(), Some("chatcmpl-1"));
    assert_eq!(response.model.as_deref(), Some("gpt-4o-mini"));
    assert_eq!(response.text(), Some("Let me check."));
    assert_eq!(response.finish_reason, Some(FinishReason::ToolExecution));
    assert_eq!(response.usage.as_ref().and_then(|u| u.total()), Some(30));

    let calls = handler.complete_tool_calls.lock().unwrap();
    let summary: Vec<(u32, Option<&str>, &str)> = calls
        .iter()
        .map(|c| (c.index, c.request.name.as_deref(), c.request.arguments.as_str()))
        .collect();
    assert_eq!(
        summary,
        [
            (0, Some("get_weather"), "{\"city\":\"Paris\"}"),
            (1, Some("get_time"), "{}"),
        ]
    );
    assert_eq!(handler.partial_tool_calls.lock().unwrap().len(), 3);
    assert_eq!(
        response.tool_execution_requests,
        calls.iter().map(|c| c.request.clone()).collect::<Vec<_>>()
    );
    assert!(handler.errors.lock().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_chunk_reaches_on_error() {
    let body = "data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n\ndata: {oops\n\n";
    let chunks = vec![Ok::<_, std::io::Error>(body.as_bytes().to_vec())];
    let handler = RecordingHandler::default();

    let result = consume_stream(decode_sse_stream(stream::iter(chunks)), &handler, None).await;

    assert!(matches!(result, Err(LlmError::ParseError(_))));
    assert_eq!(*handler.partials.lock().unwrap(), ["ok"]);
    assert!(matches!(
        handler.errors.lock().unwrap().as_slice(),
        [LlmError::ParseError(_)]
    ));
}

#[tokio::test]
async fn response_lists_calls_in_the_order_observers_saw_them() {
    let handler = RecordingHandler::default();
    let input = events(vec![
        ToolCallDelta::new(0).with_id("x1").with_name("search").completed().into(),
        ToolCallDelta::new(1).with_id("x2").with_name("fetch").completed().into(),
        ToolCallDelta::new(0).with_id("x3").with_name("summarize").into(),
    ]);

    let response = consume_stream(input, &handler, None).await.unwrap();

    let observed: Vec<_> = handler
        .complete_tool_calls
        .lock()
        .unwrap()
        .iter()
        .map(|c| c.request.clone())
        .collect();
    let ids: Vec<_> = response
        .tool_execution_requests
        .iter()
        .map(|r| r.id.as_deref())
        .collect();
    assert_eq!(ids, [Some("x1"), Some("x2"), Some("x3")]);
    assert_eq!(response.tool_execution_requests, observed);
}

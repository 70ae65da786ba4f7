//! Queue samples.

pub mod auto_forward;
pub mod browse;
pub mod dead_letter;
pub mod duplicate_detection;
pub mod getting_started;
pub mod partitioned;
pub mod prefetch;
pub mod receive_loop;
pub mod scheduled;
pub mod time_to_live;
pub mod with_proxy;

use async_trait::async_trait;
use sbcore::handler::{Disposition, MessageHandler};
use sbcore::message::{OutgoingMessage, ReceivedMessageView};
use sbcore::model::{Scientist, scientists};
use sbcore::{SampleError, SampleResult};
use std::time::Duration;

pub const BASIC_QUEUE: &str = "BasicQueue";
pub const SCIENTIST_LABEL: &str = "Scientist";

/// One JSON message per scientist, ids `0..`, labelled `Scientist`.
pub fn scientist_messages(time_to_live: Duration) -> SampleResult<Vec<OutgoingMessage>> {
    scientists()
        .iter()
        .enumerate()
        .map(|(i, scientist)| {
            Ok(OutgoingMessage::json(scientist)?
                .with_message_id(i.to_string())
                .with_subject(SCIENTIST_LABEL)
                .with_time_to_live(time_to_live))
        })
        .collect()
}

pub fn print_sent(messages: &[OutgoingMessage]) {
    for message in messages {
        println!(
            "Message sent: Id = {}",
            message.message_id.as_deref().unwrap_or("-")
        );
    }
}

/// Prints scientist messages and completes everything it sees.
#[derive(Debug, Default)]
pub struct ScientistPrinter;

#[async_trait]
impl MessageHandler for ScientistPrinter {
    async fn on_message(&self, message: &ReceivedMessageView) -> SampleResult<Disposition> {
        println!("{}", describe_scientist(message));
        Ok(Disposition::Complete)
    }

    async fn on_error(&self, error: &SampleError) {
        println!("Message handler error: {error}");
    }
}

/// Console rendering shared by the queue samples. Non-scientist payloads are
/// printed as plain message details.
pub fn describe_scientist(message: &ReceivedMessageView) -> String {
    let details = message.describe(3);
    let is_scientist = message.subject.as_deref() == Some(SCIENTIST_LABEL) && message.is_json();
    match message.body_json::<Scientist>() {
        Ok(scientist) if is_scientist => {
            // Replace the raw JSON content line with the decoded fields.
            let headers = details.rsplit_once('\n').map_or(details.as_str(), |(h, _)| h);
            format!(
                "\t\tMessage received:\n{headers}\n\t\t\tContent: [ firstName = {}, name = {} ]",
                scientist.first_name, scientist.name
            )
        }
        _ => format!("\t\tMessage received:\n{details}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims::assert_ok;

    #[test]
    fn scientist_batch_is_labelled_json() {
        let messages = assert_ok!(scientist_messages(Duration::from_secs(120)));
        assert_eq!(messages.len(), 10);
        assert_eq!(messages[3].message_id.as_deref(), Some("3"));
        assert!(messages.iter().all(|m| m.subject.as_deref() == Some("Scientist")));
        assert!(messages
            .iter()
            .all(|m| m.time_to_live == Some(Duration::from_secs(120))));
    }

    #[test]
    fn describe_prints_scientist_fields() {
        let view = ReceivedMessageView {
            message_id: Some("0".to_string()),
            subject: Some("Scientist".to_string()),
            content_type: Some("application/json".to_string()),
            body: br#"{"name":"Einstein","firstName":"Albert"}"#.to_vec(),
            ..Default::default()
        };
        let text = describe_scientist(&view);
        assert!(text.contains("MessageId = 0"));
        assert!(text.contains("Content: [ firstName = Albert, name = Einstein ]"));
    }
}

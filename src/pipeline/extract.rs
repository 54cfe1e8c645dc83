//! Entity extractors: customer name, requested service, requested date/time.

use regex::Regex;
use tracing::debug;

use crate::business::Service;
use crate::error::PipelineError;
use crate::pipeline::context::RunContext;
use crate::pipeline::dates::DateParser;

/// Capitalized first name plus an optional capitalized second word.
const NAME_CAPTURE: &str = r"([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)";

/// Extracts a self-introduced customer name.
///
/// The anchor phrase is case-insensitive; the captured name must start
/// with an uppercase letter.
pub struct NameExtractor {
    patterns: Vec<Regex>,
}

impl NameExtractor {
    pub fn new() -> Self {
        let anchors = [r"\bi['’]?m", r"\bmy name is", r"\bthis is"];
        let patterns = anchors
            .iter()
            .map(|anchor| Regex::new(&format!(r"(?i:{anchor})\s+{NAME_CAPTURE}")).unwrap())
            .collect();
        Self { patterns }
    }

    /// Name from the first pattern that matches, in pattern order.
    pub fn extract(&self, message: &str) -> Option<String> {
        self.patterns.iter().find_map(|pattern| {
            pattern
                .captures(message)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
        })
    }

    /// Run the extractor against the context.
    pub fn apply(&self, ctx: &mut RunContext) -> Option<String> {
        let name = self.extract(&ctx.raw_message)?;
        ctx.set_customer_name(name.clone()).then_some(name)
    }
}

impl Default for NameExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// First service (in catalog order) whose name appears in the message,
/// compared case-insensitively.
pub fn match_service<'a>(message: &str, services: &'a [Service]) -> Option<&'a Service> {
    let lowered = message.to_lowercase();
    services
        .iter()
        .find(|service| lowered.contains(&service.name.to_lowercase()))
}

/// Run the service matcher against the context.
pub fn apply_service(ctx: &mut RunContext, services: &[Service]) -> Option<String> {
    let service = match_service(&ctx.raw_message, services)?;
    let name = service.name.clone();
    ctx.set_requested_service(name.clone()).then_some(name)
}

/// Delegate the message to the date parser and record the result.
pub async fn apply_datetime(
    ctx: &mut RunContext,
    parser: &dyn DateParser,
) -> Result<Option<chrono::NaiveDateTime>, PipelineError> {
    let Some(when) = parser.parse_first(&ctx.raw_message).await? else {
        debug!("No date/time found in message");
        return Ok(None);
    };
    Ok(ctx.set_requested_date_time(when).then_some(when))
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveDateTime};

    use super::*;
    use crate::pipeline::context::Channel;

    #[test]
    fn im_pattern() {
        let names = NameExtractor::new();
        assert_eq!(
            names.extract("Hi, I'm Deva. Can I book a haircut?"),
            Some("Deva".into())
        );
        assert_eq!(names.extract("im Jane Doe here"), Some("Jane Doe".into()));
    }

    #[test]
    fn my_name_is_and_this_is() {
        let names = NameExtractor::new();
        assert_eq!(names.extract("Hello, my name is Carla"), Some("Carla".into()));
        assert_eq!(names.extract("MY NAME IS Omar Khan"), Some("Omar Khan".into()));
        assert_eq!(names.extract("Hey this is Lee"), Some("Lee".into()));
    }

    #[test]
    fn first_pattern_wins() {
        let names = NameExtractor::new();
        assert_eq!(names.extract("I'm Ana, this is Bob"), Some("Ana".into()));
        assert_eq!(names.extract("This is Bob and I'm Ana"), Some("Ana".into()));
    }

    #[test]
    fn name_must_be_capitalized() {
        let names = NameExtractor::new();
        assert_eq!(names.extract("I'm very frustrated"), None);
        assert_eq!(names.extract("this is ridiculous"), None);
    }

    #[test]
    fn anchor_needs_word_boundary() {
        let names = NameExtractor::new();
        assert_eq!(names.extract("Tim Cook called"), None);
    }

    #[test]
    fn apply_does_not_overwrite() {
        let names = NameExtractor::new();
        let mut ctx = RunContext::new("b1", Channel::Web, "I'm Ana");
        ctx.set_customer_name("Existing");
        assert_eq!(names.apply(&mut ctx), None);
        assert_eq!(ctx.customer_name.as_deref(), Some("Existing"));
    }

    #[test]
    fn service_match_is_case_insensitive_substring() {
        let services = vec![Service::new("Beard Trim", 20), Service::new("Haircut", 30)];
        assert_eq!(
            match_service("need a HAIRCUT asap", &services).map(|s| s.name.as_str()),
            Some("Haircut")
        );
        assert!(match_service("need a trim", &services).is_none());
    }

    #[test]
    fn first_service_in_catalog_order_wins() {
        let services = vec![Service::new("Cut", 15), Service::new("Haircut", 30)];
        assert_eq!(
            match_service("a haircut please", &services).map(|s| s.name.as_str()),
            Some("Cut")
        );
    }

    #[test]
    fn apply_service_sets_context() {
        let services = vec![Service::new("Haircut", 30)];
        let mut ctx = RunContext::new("b1", Channel::Sms, "haircut tomorrow");
        assert_eq!(apply_service(&mut ctx, &services), Some("Haircut".into()));
        assert_eq!(ctx.requested_service.as_deref(), Some("Haircut"));

        let mut empty = RunContext::new("b1", Channel::Sms, "nothing here");
        assert_eq!(apply_service(&mut empty, &services), None);
        assert!(empty.requested_service.is_none());
    }

    struct FixedParser(Option<NaiveDateTime>);

    #[async_trait]
    impl DateParser for FixedParser {
        async fn parse_first(&self, _text: &str) -> Result<Option<NaiveDateTime>, PipelineError> {
            Ok(self.0)
        }
    }

    struct BrokenParser;

    #[async_trait]
    impl DateParser for BrokenParser {
        async fn parse_first(&self, _text: &str) -> Result<Option<NaiveDateTime>, PipelineError> {
            Err(PipelineError::DateParse("backend down".into()))
        }
    }

    #[tokio::test]
    async fn datetime_uses_parser_value_as_is() {
        let when = NaiveDate::from_ymd_opt(2026, 10, 18)
            .unwrap()
            .and_hms_opt(15, 0, 0)
            .unwrap();
        let mut ctx = RunContext::new("b1", Channel::Web, "tomorrow at 3pm");
        let parsed = apply_datetime(&mut ctx, &FixedParser(Some(when))).await.unwrap();
        assert_eq!(parsed, Some(when));
        assert_eq!(ctx.requested_date_time, Some(when));
    }

    #[tokio::test]
    async fn datetime_none_leaves_field_unset() {
        let mut ctx = RunContext::new("b1", Channel::Web, "hello");
        assert_eq!(apply_datetime(&mut ctx, &FixedParser(None)).await.unwrap(), None);
        assert!(ctx.requested_date_time.is_none());
    }

    #[tokio::test]
    async fn datetime_parser_error_propagates() {
        let mut ctx = RunContext::new("b1", Channel::Web, "hello");
        assert!(apply_datetime(&mut ctx, &BrokenParser).await.is_err());
        assert!(ctx.requested_date_time.is_none());
    }
}

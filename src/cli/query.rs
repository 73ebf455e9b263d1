//! Query command implementation

use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use std::io;
use std::time::Duration;
use tracing::debug;

use super::Context;
use crate::api::{QueryApi, VmClient};
use crate::render::{new_writer, Options, Writer};
use crate::utils::{format_duration, parse_duration, parse_time};

#[derive(Args, Debug)]
#[command(args_conflicts_with_subcommands = true)]
pub struct QueryArgs {
    #[command(subcommand)]
    command: Option<QueryCommand>,

    /// MetricsQL or PromQL expression
    query: Option<String>,

    /// Evaluation time: RFC3339, Unix seconds or "now"; empty lets the server decide
    #[arg(long, default_value = "now", value_name = "TIME")]
    time: String,

    /// Run a range query over this window, ending at --time
    #[arg(long, default_value = "0s", value_parser = parse_duration, value_name = "DURATION")]
    range: Duration,

    /// Resolution of a range query
    #[arg(long, default_value = "1m", value_parser = parse_duration, value_name = "DURATION")]
    step: Duration,
}

#[derive(Subcommand, Debug)]
enum QueryCommand {
    /// List metric names
    Metrics,

    /// List label names
    Labels,

    /// List the values of a label
    LabelValues {
        label: String,
    },

    /// List series matching the selectors
    Series {
        #[arg(required = true, value_name = "MATCH")]
        matches: Vec<String>,
    },
}

/// A fully parsed query invocation.
#[derive(Debug, Clone, PartialEq)]
enum Request {
    Instant { query: String, time: Option<DateTime<Utc>> },
    Range { query: String, start: DateTime<Utc>, end: DateTime<Utc>, step: Duration },
    Metrics,
    Labels,
    LabelValues(String),
    Series(Vec<String>),
}

impl Request {
    /// `None` when there is nothing to run.
    fn from_args(args: QueryArgs) -> Result<Option<Self>> {
        let request = match args.command {
            Some(QueryCommand::Metrics) => Request::Metrics,
            Some(QueryCommand::Labels) => Request::Labels,
            Some(QueryCommand::LabelValues { label }) => Request::LabelValues(label),
            Some(QueryCommand::Series { matches }) => Request::Series(matches),
            None => {
                let Some(query) = args.query.filter(|q| !q.trim().is_empty()) else {
                    return Ok(None);
                };
                let time = parse_time(&args.time).context("invalid --time")?;
                if args.range.is_zero() {
                    Request::Instant { query, time }
                } else {
                    let end = time.unwrap_or_else(Utc::now);
                    let too_large =
                        || format!("--range {} is too large", format_duration(args.range));
                    let start = chrono::Duration::from_std(args.range)
                        .ok()
                        .and_then(|range| end.checked_sub_signed(range))
                        .with_context(too_large)?;
                    Request::Range { query, start, end, step: args.step }
                }
            }
        };
        Ok(Some(request))
    }
}

pub fn run(args: QueryArgs, ctx: &Context) -> Result<()> {
    let Some(request) = Request::from_args(args)? else {
        let mut command = super::command();
        if let Some(query) = command.find_subcommand_mut("query") {
            query.print_help()?;
        }
        return Ok(());
    };

    let config = ctx.config()?;
    let options = Options { no_headers: config.output.no_headers };
    let mut writer = new_writer(&config.output.format, Box::new(io::stdout().lock()), options)?;
    let client = VmClient::new(&config).context("failed to create API client")?;
    debug!("Querying {}", client.base_url());

    execute(&client, &request, writer.as_mut())
}

fn execute(api: &dyn QueryApi, request: &Request, writer: &mut dyn Writer) -> Result<()> {
    match request {
        Request::Instant { query, time } => {
            let result = api.query(query, *time).context("query failed")?;
            writer.write_query_result(&result)
        }
        Request::Range { query, start, end, step } => {
            let result = api.query_range(query, *start, *end, *step).context("range query failed")?;
            writer.write_query_result(&result)
        }
        Request::Metrics => {
            let names = api.label_values("__name__", None, None).context("failed to list metrics")?;
            writer.write_strings(&names)
        }
        Request::Labels => {
            let labels = api.labels(None, None).context("failed to list labels")?;
            writer.write_strings(&labels)
        }
        Request::LabelValues(label) => {
            let values = api
                .label_values(label, None, None)
                .with_context(|| format!("failed to list values of label '{label}'"))?;
            writer.write_strings(&values)
        }
        Request::Series(matches) => {
            let series = api.series(matches, None, None).context("failed to list series")?;
            writer.write_series(&series)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, LabelSet, QueryResult, SampleValue};
    use crate::render::JsonWriter;
    use clap::Parser;
    use std::cell::RefCell;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: QueryArgs,
    }

    fn parse(argv: &[&str]) -> Option<Request> {
        let argv = std::iter::once("query").chain(argv.iter().copied());
        Request::from_args(TestCli::parse_from(argv).args).unwrap()
    }

    #[derive(Default)]
    struct FakeApi {
        calls: RefCell<Vec<String>>,
    }

    impl QueryApi for FakeApi {
        fn query(&self, query: &str, time: Option<DateTime<Utc>>) -> Result<QueryResult, ApiError> {
            self.calls.borrow_mut().push(format!("query {query} {}", time.is_some()));
            Ok(QueryResult::Scalar(SampleValue { timestamp: 0.0, value: 2.0 }))
        }

        fn query_range(
            &self,
            query: &str,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
            step: Duration,
        ) -> Result<QueryResult, ApiError> {
            let span = (end - start).num_seconds();
            self.calls.borrow_mut().push(format!("range {query} {span} {}", step.as_secs()));
            Ok(QueryResult::Matrix(Vec::new()))
        }

        fn series(
            &self,
            matches: &[String],
            _start: Option<DateTime<Utc>>,
            _end: Option<DateTime<Utc>>,
        ) -> Result<Vec<LabelSet>, ApiError> {
            self.calls.borrow_mut().push(format!("series {}", matches.join(" ")));
            Ok(Vec::new())
        }

        fn labels(
            &self,
            _start: Option<DateTime<Utc>>,
            _end: Option<DateTime<Utc>>,
        ) -> Result<Vec<String>, ApiError> {
            self.calls.borrow_mut().push("labels".to_string());
            Ok(vec!["job".to_string()])
        }

        fn label_values(
            &self,
            label: &str,
            _start: Option<DateTime<Utc>>,
            _end: Option<DateTime<Utc>>,
        ) -> Result<Vec<String>, ApiError> {
            self.calls.borrow_mut().push(format!("values {label}"));
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_instant_query_defaults_to_now() {
        match parse(&["up"]) {
            Some(Request::Instant { query, time }) => {
                assert_eq!(query, "up");
                assert!(time.is_some());
            }
            other => panic!("unexpected request: {other:?}"),
        }
    }

    #[test]
    fn test_empty_time_is_unset() {
        assert_eq!(parse(&["up", "--time", ""]), Some(Request::Instant { query: "up".into(), time: None }));
    }

    #[test]
    fn test_range_query_window_ends_at_time() {
        let request = parse(&["rate(x[5m])", "--time", "1700000000", "--range", "1h", "--step", "30s"]);
        let end = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(
            request,
            Some(Request::Range {
                query: "rate(x[5m])".into(),
                start: end - chrono::Duration::hours(1),
                end,
                step: Duration::from_secs(30),
            })
        );
    }

    #[test]
    fn test_missing_query_is_none() {
        assert_eq!(parse(&[]), None);
    }

    #[test]
    fn test_invalid_time_echoes_literal() {
        let args = TestCli::parse_from(["query", "up", "--time", "garbage"]).args;
        let err = Request::from_args(args).unwrap_err();
        assert!(format!("{err:#}").contains("garbage"));
    }

    #[test]
    fn test_range_beyond_calendar_is_an_error() {
        let args = TestCli::parse_from(["query", "up", "--range", "1000000000d"]).args;
        let err = Request::from_args(args).unwrap_err();
        assert!(err.to_string().starts_with("--range "), "{err}");
        assert!(err.to_string().ends_with(" is too large"), "{err}");
    }

    #[test]
    fn test_subcommands() {
        assert_eq!(parse(&["metrics"]), Some(Request::Metrics));
        assert_eq!(parse(&["label-values", "job"]), Some(Request::LabelValues("job".into())));
        assert_eq!(parse(&["series", "up", "{job=\"vm\"}"]), Some(Request::Series(vec!["up".into(), "{job=\"vm\"}".into()])));
    }

    #[test]
    fn test_execute_dispatches() {
        let api = FakeApi::default();
        let mut buf = Vec::new();
        {
            let mut writer = JsonWriter::new(Box::new(&mut buf));
            execute(&api, &Request::Metrics, &mut writer).unwrap();
            execute(&api, &Request::Labels, &mut writer).unwrap();
            let end = Utc::now();
            let range = Request::Range {
                query: "up".into(),
                start: end - chrono::Duration::minutes(5),
                end,
                step: Duration::from_secs(60),
            };
            execute(&api, &range, &mut writer).unwrap();
        }
        assert_eq!(*api.calls.borrow(), vec!["values __name__", "labels", "range up 300 60"]);
        assert!(String::from_utf8(buf).unwrap().contains("\"job\""));
    }
}

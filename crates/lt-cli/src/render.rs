use std::io::{self, Write};

use clap::ValueEnum;
use lt_core::RawRecord;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// `query name timestamp` columns
    #[default]
    Default,
    /// The raw record body
    Json,
}

/// One resolver query-log document. Unknown fields are ignored and missing
/// ones default to empty.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DnsQuery {
    pub version: String,
    pub account_id: String,
    pub region: String,
    pub vpc_id: String,
    pub query_timestamp: String,
    pub query_name: String,
    pub query_type: String,
    pub query_class: String,
    pub rcode: String,
    pub answers: Vec<DnsAnswer>,
    pub srcaddr: String,
    pub srcport: String,
    pub transport: String,
    pub srcids: SourceIds,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct DnsAnswer {
    pub rdata: String,
    #[serde(rename = "Type")]
    pub kind: String,
    pub class: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SourceIds {
    pub instance: String,
}

pub fn write_header(format: OutputFormat, out: &mut impl Write) -> io::Result<()> {
    match format {
        OutputFormat::Default => writeln!(out, "{:<5} {:<45} {:<14}", "query", "name", "timestamp"),
        OutputFormat::Json => Ok(()),
    }
}

/// Bodies that are not a query-log document print verbatim.
pub fn write_record(format: OutputFormat, record: &RawRecord, out: &mut impl Write) -> io::Result<()> {
    match format {
        OutputFormat::Json => writeln!(out, "{}", record.body),
        OutputFormat::Default => match serde_json::from_str::<DnsQuery>(&record.body) {
            Ok(q) => writeln!(
                out,
                "{:<5} {:<45} {:<14}",
                q.query_type, q.query_name, q.query_timestamp
            ),
            Err(_) => writeln!(out, "{}", record.body),
        },
    }
}

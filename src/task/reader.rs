use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter, Trim};

use super::Task;
use crate::error::InputError;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Lazily parses `entity,start,end` CSV records.
///
/// Records are yielded in file order. Quoting follows RFC 4180, fields are
/// trimmed and blank lines are skipped. When `has_header` is set the first
/// record is treated as a header. Each error carries the 1-based line number
/// the record started on.
pub struct TaskReader<R> {
    records: StringRecordsIntoIter<R>,
    last_line: u64,
}

impl TaskReader<Box<dyn Read + Send>> {
    /// Open a task file; `-` reads from stdin
    pub fn open(path: &Path, has_header: bool) -> io::Result<Self> {
        let source: Box<dyn Read + Send> = if path == Path::new("-") {
            Box::new(io::stdin())
        } else {
            Box::new(File::open(path)?)
        };
        Ok(Self::new(source, has_header))
    }
}

impl<R: Read> TaskReader<R> {
    pub fn new(source: R, has_header: bool) -> Self {
        let records = ReaderBuilder::new()
            .has_headers(has_header)
            .trim(Trim::All)
            // Field counts are checked per record to report them with a line number
            .flexible(true)
            .from_reader(source)
            .into_records();

        Self {
            records,
            last_line: 0,
        }
    }
}

impl<R: Read> Iterator for TaskReader<R> {
    type Item = Result<Task, InputError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = match self.records.next()? {
                Ok(record) => record,
                Err(source) => {
                    let line = source
                        .position()
                        .map_or(self.last_line + 1, |position| position.line());
                    return Some(Err(InputError::Csv { line, source }));
                }
            };

            let line = record
                .position()
                .map_or(self.last_line + 1, |position| position.line());
            self.last_line = line;

            // Whitespace-only line
            if record.len() == 1 && record[0].is_empty() {
                continue;
            }

            return Some(parse_record(&record, line));
        }
    }
}

fn parse_record(record: &StringRecord, line: u64) -> Result<Task, InputError> {
    if record.len() != 3 {
        return Err(InputError::FieldCount {
            line,
            found: record.len(),
        });
    }
    let (entity_id, start, end) = (&record[0], &record[1], &record[2]);

    if entity_id.is_empty() {
        return Err(InputError::EmptyEntity { line });
    }

    let window_start = parse_timestamp(start, line)?;
    let window_end = parse_timestamp(end, line)?;
    if window_start > window_end {
        return Err(InputError::InvertedWindow {
            line,
            start: window_start,
            end: window_end,
        });
    }

    Ok(Task::new(entity_id, window_start, window_end))
}

/// Accepts `YYYY-MM-DD HH:MM:SS[.fff]` (taken as UTC) or RFC 3339
fn parse_timestamp(value: &str, line: u64) -> Result<DateTime<Utc>, InputError> {
    match NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT) {
        Ok(naive) => Ok(naive.and_utc()),
        Err(source) => DateTime::parse_from_rfc3339(value)
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(|_| InputError::Timestamp {
                line,
                value: value.to_string(),
                source,
            }),
    }
}

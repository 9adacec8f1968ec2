//! MySQL backend on top of `mysql_async`.
//!
//! Every [`MySqlConnector::connect`] opens a brand new connection; there is
//! no pool. Statements go over the text protocol, so most values come back
//! as bytes and are normalised to JSON using the column type.

use async_trait::async_trait;
use mysql_async::consts::ColumnType;
use mysql_async::prelude::*;
use mysql_async::{Conn, OptsBuilder, Value};
use serde_json::Number;
use sqlroute_common::{DbCredentials, Node, Result, Row, SqlrouteError};
use std::time::Duration;

use crate::backend::{Connector, ReadOutcome, Session};

/// Opens `mysql_async` connections with a bounded connect timeout.
#[derive(Debug, Clone)]
pub struct MySqlConnector {
    credentials: DbCredentials,
    connect_timeout: Duration,
}

impl MySqlConnector {
    pub fn new(credentials: DbCredentials, connect_timeout: Duration) -> Self {
        Self {
            credentials,
            connect_timeout,
        }
    }

    fn opts(&self, node: &Node) -> OptsBuilder {
        OptsBuilder::default()
            .ip_or_hostname(node.host.clone())
            .tcp_port(node.port)
            .user(Some(self.credentials.user.clone()))
            .pass(Some(self.credentials.password.clone()))
            .db_name(Some(self.credentials.database.clone()))
    }
}

#[async_trait]
impl Connector for MySqlConnector {
    async fn connect(&self, node: &Node) -> Result<Box<dyn Session>> {
        let conn = tokio::time::timeout(self.connect_timeout, Conn::new(self.opts(node)))
            .await
            .map_err(|_| {
                SqlrouteError::DatabaseUnavailable(format!(
                    "Timed out connecting to {} after {}ms",
                    node,
                    self.connect_timeout.as_millis()
                ))
            })?
            .map_err(|e| SqlrouteError::DatabaseUnavailable(e.to_string()))?;

        Ok(Box::new(MySqlSession { conn }))
    }
}

struct MySqlSession {
    conn: Conn,
}

#[async_trait]
impl Session for MySqlSession {
    async fn query(&mut self, sql: &str) -> Result<ReadOutcome> {
        let mut result = self.conn.query_iter(sql).await.map_err(statement_error)?;

        let columns = result.columns().map(|c| c.to_vec()).unwrap_or_default();
        let raw_rows: Vec<mysql_async::Row> = result.collect().await.map_err(statement_error)?;
        result.drop_result().await.map_err(statement_error)?;

        let rows = raw_rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .enumerate()
                    .map(|(i, column)| {
                        let value = row.as_ref(i).cloned().unwrap_or(Value::NULL);
                        normalize_value(value, column.column_type())
                    })
                    .collect::<Row>()
            })
            .collect();

        Ok(ReadOutcome {
            columns: columns.iter().map(|c| c.name_str().into_owned()).collect(),
            rows,
        })
    }

    async fn execute(&mut self, sql: &str) -> Result<u64> {
        self.conn.query_drop(sql).await.map_err(statement_error)?;
        Ok(self.conn.affected_rows())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.conn
            .disconnect()
            .await
            .map_err(|e| SqlrouteError::DatabaseUnavailable(e.to_string()))
    }
}

/// Lost connections are the node's fault, anything else the statement's.
fn statement_error(err: mysql_async::Error) -> SqlrouteError {
    match err {
        mysql_async::Error::Io(e) => SqlrouteError::DatabaseUnavailable(e.to_string()),
        other => SqlrouteError::QueryExecutionFailed(other.to_string()),
    }
}

/// Converts one text-protocol value to JSON.
///
/// NULL becomes `null`, integer columns become JSON integers, FLOAT, DOUBLE
/// and DECIMAL columns become JSON numbers, and everything else (text,
/// dates, times, blobs) becomes a string, decoding non-UTF-8 bytes lossily.
pub(crate) fn normalize_value(value: Value, column_type: ColumnType) -> serde_json::Value {
    match value {
        Value::NULL => serde_json::Value::Null,
        Value::Int(n) => n.into(),
        Value::UInt(n) => n.into(),
        Value::Float(f) => float_or_string(f as f64, || f.to_string()),
        Value::Double(d) => float_or_string(d, || d.to_string()),
        Value::Bytes(bytes) => normalize_bytes(&bytes, column_type),
        Value::Date(year, month, day, hour, minute, second, micros) => {
            if column_type == ColumnType::MYSQL_TYPE_DATE {
                format!("{:04}-{:02}-{:02}", year, month, day).into()
            } else if micros > 0 {
                format!(
                    "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:06}",
                    year, month, day, hour, minute, second, micros
                )
                .into()
            } else {
                format!(
                    "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                    year, month, day, hour, minute, second
                )
                .into()
            }
        }
        Value::Time(negative, days, hours, minutes, seconds, micros) => {
            let sign = if negative { "-" } else { "" };
            let hours = days * 24 + u32::from(hours);
            if micros > 0 {
                format!("{}{:02}:{:02}:{:02}.{:06}", sign, hours, minutes, seconds, micros).into()
            } else {
                format!("{}{:02}:{:02}:{:02}", sign, hours, minutes, seconds).into()
            }
        }
    }
}

fn normalize_bytes(bytes: &[u8], column_type: ColumnType) -> serde_json::Value {
    let text = String::from_utf8_lossy(bytes);

    if is_integer_type(column_type) {
        if let Ok(n) = text.parse::<i64>() {
            return n.into();
        }
        if let Ok(n) = text.parse::<u64>() {
            return n.into();
        }
    } else if is_fractional_type(column_type) {
        if let Ok(f) = text.parse::<f64>() {
            if let Some(n) = Number::from_f64(f) {
                return serde_json::Value::Number(n);
            }
        }
    }

    serde_json::Value::String(text.into_owned())
}

fn float_or_string(f: f64, fallback: impl FnOnce() -> String) -> serde_json::Value {
    match Number::from_f64(f) {
        Some(n) => serde_json::Value::Number(n),
        None => serde_json::Value::String(fallback()),
    }
}

fn is_integer_type(column_type: ColumnType) -> bool {
    matches!(
        column_type,
        ColumnType::MYSQL_TYPE_TINY
            | ColumnType::MYSQL_TYPE_SHORT
            | ColumnType::MYSQL_TYPE_LONG
            | ColumnType::MYSQL_TYPE_LONGLONG
            | ColumnType::MYSQL_TYPE_INT24
            | ColumnType::MYSQL_TYPE_YEAR
    )
}

fn is_fractional_type(column_type: ColumnType) -> bool {
    matches!(
        column_type,
        ColumnType::MYSQL_TYPE_FLOAT
            | ColumnType::MYSQL_TYPE_DOUBLE
            | ColumnType::MYSQL_TYPE_DECIMAL
            | ColumnType::MYSQL_TYPE_NEWDECIMAL
    )
}

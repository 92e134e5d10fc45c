//! Field-level and cross-field validation of parsed flow-log records.

use crate::errors::ValidationError;
use crate::flow_record::{
    aws_field_name, FieldPresenceMap, FlowLogRecord, ACCOUNT_ID_KEY, ACTION_KEY, BYTES_KEY,
    DST_ADDR_KEY, DST_PORT_KEY, END_KEY, INTERFACE_ID_KEY, LOG_STATUS_KEY, PACKETS_KEY,
    PROTOCOL_KEY, SRC_ADDR_KEY, SRC_PORT_KEY, START_KEY, VERSION_KEY, V2_DEFAULT_FIELD_NAMES,
};

/// Validates a record against the fields declared by its format. Version
/// ordering is checked by the parsers; everything else lives here.
pub fn validate_record(
    record: &FlowLogRecord,
    presence: &FieldPresenceMap,
) -> Result<(), ValidationError> {
    // Custom formats must carry every V2 default field; without them the
    // record is not forwarded.
    if !presence.is_default() {
        for field in V2_DEFAULT_FIELD_NAMES {
            if !presence.has_field(field) {
                return Err(ValidationError {
                    field: field.to_string(),
                    expected: None,
                    actual: String::new(),
                    message: format!(
                        "Custom format must include all V2 default fields. Missing required field: '{field}'"
                    ),
                });
            }
        }
    }

    let require_string = |key: &str, value: &str| -> Result<(), ValidationError> {
        let name = aws_field_name(key);
        if presence.has_field(&name) && value.is_empty() {
            return Err(ValidationError {
                field: name.clone(),
                expected: None,
                actual: value.to_string(),
                message: format!("Required field '{name}' is empty or missing"),
            });
        }
        Ok(())
    };

    require_string(VERSION_KEY, &record.version)?;
    require_string(ACCOUNT_ID_KEY, &record.account_id)?;
    require_string(INTERFACE_ID_KEY, &record.interface_id)?;
    require_string(SRC_ADDR_KEY, &record.src_addr)?;
    require_string(DST_ADDR_KEY, &record.dst_addr)?;
    require_string(SRC_PORT_KEY, &record.src_port)?;
    require_string(DST_PORT_KEY, &record.dst_port)?;
    require_string(PROTOCOL_KEY, &record.protocol)?;
    require_string(ACTION_KEY, &record.action)?;
    require_string(LOG_STATUS_KEY, &record.log_status)?;

    let require_non_negative = |key: &str, value: i64, what: &str| -> Result<(), ValidationError> {
        let name = aws_field_name(key);
        if presence.has_field(&name) && value < 0 {
            return Err(ValidationError {
                field: name,
                expected: None,
                actual: value.to_string(),
                message: format!("{what} cannot be negative"),
            });
        }
        Ok(())
    };

    require_non_negative(PACKETS_KEY, record.packets, "Packets count")?;
    require_non_negative(BYTES_KEY, record.bytes, "Bytes count")?;
    require_non_negative(START_KEY, record.start, "Start time")?;
    require_non_negative(END_KEY, record.end, "End time")?;

    if presence.has_field("start") && presence.has_field("end") && record.start > record.end {
        return Err(ValidationError {
            field: aws_field_name(START_KEY),
            expected: None,
            actual: format!("start: {}, end: {}", record.start, record.end),
            message: "Start time cannot be greater than end time".to_string(),
        });
    }

    if presence.has_field("account-id") {
        if record.account_id.len() != 12 {
            return Err(ValidationError {
                field: aws_field_name(ACCOUNT_ID_KEY),
                expected: None,
                actual: record.account_id.clone(),
                message: "Invalid AWS account ID format (expected 12 digits)".to_string(),
            });
        }
        if !record.account_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError {
                field: aws_field_name(ACCOUNT_ID_KEY),
                expected: None,
                actual: record.account_id.clone(),
                message: "Invalid AWS account ID format (must contain only digits)".to_string(),
            });
        }
    }

    if presence.has_field("action") && record.action != "ACCEPT" && record.action != "REJECT" {
        return Err(ValidationError {
            field: aws_field_name(ACTION_KEY),
            expected: None,
            actual: record.action.clone(),
            message: "Invalid action value (must be ACCEPT or REJECT)".to_string(),
        });
    }

    if presence.has_field("log-status")
        && record.log_status != "OK"
        && record.log_status != "NODATA"
        && record.log_status != "SKIPDATA"
    {
        return Err(ValidationError {
            field: aws_field_name(LOG_STATUS_KEY),
            expected: None,
            actual: record.log_status.clone(),
            message: "Invalid log status (must be OK, NODATA, or SKIPDATA)".to_string(),
        });
    }

    Ok(())
}

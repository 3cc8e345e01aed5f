//! 表格生成服务
//!
//! 把按顺序排列的提取记录写成单工作表的 xlsx 文件（内存中的字节）

use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use serde_json::Value as JsonValue;

use crate::models::ExtractionRecord;

/// 工作表名称
pub const SHEET_NAME: &str = "Extracted Data";

/// xlsx 单元格文本长度上限
const MAX_CELL_CHARS: usize = 32_767;

/// 汇总所有记录的列名
///
/// 按首次出现的顺序取并集，通常就是第一条记录的键顺序
pub fn collect_headers(records: &[ExtractionRecord]) -> Vec<String> {
    let mut headers: Vec<String> = Vec::new();
    for key in records.iter().flat_map(|record| record.keys()) {
        if !headers.iter().any(|h| h == key) {
            headers.push(key.clone());
        }
    }
    headers
}

/// 生成 xlsx 文件
///
/// # 参数
/// - `records`: 提取记录（每条一行）
///
/// # 返回
/// 返回 xlsx 文件内容；不写入磁盘
pub fn build(records: &[ExtractionRecord]) -> Result<Vec<u8>, XlsxError> {
    let headers = collect_headers(records);

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    let header_format = Format::new().set_bold();

    let columns = headers
        .iter()
        .enumerate()
        .map(|(idx, header)| Ok((column_index(idx)?, header)))
        .collect::<Result<Vec<_>, XlsxError>>()?;

    for (col, header) in &columns {
        worksheet.write_string_with_format(0, *col, clamp_text(header), &header_format)?;
    }

    for (row_idx, record) in records.iter().enumerate() {
        let row = row_index(row_idx + 1)?;
        for (col, header) in &columns {
            if let Some(value) = record.get(header) {
                write_value(worksheet, row, *col, value)?;
            }
        }
    }

    if !headers.is_empty() {
        worksheet.set_freeze_panes(1, 0)?;
        worksheet.autofit();
    }

    workbook.save_to_buffer()
}

/// 按 JSON 类型写入单元格，null 留空
fn write_value(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &JsonValue,
) -> Result<(), XlsxError> {
    match value {
        JsonValue::Null => {}
        JsonValue::String(text) => {
            worksheet.write_string(row, col, clamp_text(text))?;
        }
        JsonValue::Number(number) => match number.as_f64() {
            Some(n) => {
                worksheet.write_number(row, col, n)?;
            }
            None => {
                worksheet.write_string(row, col, number.to_string())?;
            }
        },
        JsonValue::Bool(flag) => {
            worksheet.write_boolean(row, col, *flag)?;
        }
        nested @ (JsonValue::Array(_) | JsonValue::Object(_)) => {
            worksheet.write_string(row, col, clamp_text(&nested.to_string()))?;
        }
    }
    Ok(())
}

fn column_index(idx: usize) -> Result<u16, XlsxError> {
    u16::try_from(idx).map_err(|_| XlsxError::RowColumnLimitError)
}

fn row_index(idx: usize) -> Result<u32, XlsxError> {
    u32::try_from(idx).map_err(|_| XlsxError::RowColumnLimitError)
}

fn clamp_text(text: &str) -> &str {
    match text.char_indices().nth(MAX_CELL_CHARS) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
    use serde_json::json;
    use std::io::Cursor;

    fn record(value: JsonValue) -> ExtractionRecord {
        match value {
            JsonValue::Object(map) => ExtractionRecord::new(map),
            other => panic!("not an object: {}", other),
        }
    }

    fn read_rows(bytes: Vec<u8>) -> Vec<Vec<Data>> {
        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
        let range = workbook.worksheet_range(SHEET_NAME).unwrap();
        range.rows().map(|row| row.to_vec()).collect()
    }

    #[test]
    fn test_headers_are_first_seen_union() {
        let records = vec![
            record(json!({"Vendor": "A", "Total": 1})),
            record(json!({"Total": 2, "Date": "2024-05-01"})),
            record(json!({"Vendor": "C"})),
        ];
        assert_eq!(collect_headers(&records), ["Vendor", "Total", "Date"]);
    }

    #[test]
    fn test_build_writes_one_row_per_record() {
        let records = vec![
            record(json!({"Vendor": "Cafe", "Total": 12.5, "Paid": true})),
            record(json!({"Vendor": null, "Total": 3, "Items": ["tea", "cake"]})),
        ];

        let rows = read_rows(build(&records).unwrap());
        assert_eq!(rows.len(), 3);

        assert_eq!(
            rows[0],
            vec![
                Data::String("Vendor".into()),
                Data::String("Total".into()),
                Data::String("Paid".into()),
                Data::String("Items".into()),
            ]
        );
        assert_eq!(rows[1][0], Data::String("Cafe".into()));
        assert_eq!(rows[1][1], Data::Float(12.5));
        assert_eq!(rows[1][2], Data::Bool(true));
        assert_eq!(rows[1][3], Data::Empty);

        assert_eq!(rows[2][0], Data::Empty);
        assert_eq!(rows[2][1], Data::Float(3.0));
        assert_eq!(rows[2][2], Data::Empty);
        assert_eq!(rows[2][3], Data::String(r#"["tea","cake"]"#.into()));
    }

    #[test]
    fn test_build_is_deterministic_in_content() {
        let records = vec![
            record(json!({"A": "1"})),
            record(json!({"B": "2"})),
        ];
        let first = read_rows(build(&records).unwrap());
        let second = read_rows(build(&records).unwrap());
        assert_eq!(first, second);
    }

    #[test]
    fn test_too_many_columns_is_an_error() {
        let wide: serde_json::Map<String, JsonValue> = (0..=16_384)
            .map(|i| (format!("F{}", i), JsonValue::from(i)))
            .collect();
        let records = vec![ExtractionRecord::new(wide)];

        assert!(matches!(build(&records), Err(XlsxError::RowColumnLimitError)));
    }

    #[test]
    fn test_index_conversion_does_not_wrap() {
        assert_eq!(column_index(3).unwrap(), 3);
        assert!(column_index(usize::from(u16::MAX) + 1).is_err());
        assert_eq!(row_index(1).unwrap(), 1);
    }

    #[test]
    fn test_clamp_text_limits_length() {
        let long = "x".repeat(MAX_CELL_CHARS + 10);
        assert_eq!(clamp_text(&long).len(), MAX_CELL_CHARS);
        assert_eq!(clamp_text("short"), "short");
    }
}

//! CSV and XLSX rendering for search exports.
//!
//! The CSV wire contract is fixed for compatibility with the existing
//! consumers: UTF-8 with BOM, semicolon-delimited, one header row, `\n`
//! line ends, newlines inside values flattened to single spaces and literal
//! semicolons replaced with commas.

use chrono::{DateTime, NaiveDate, Utc};
use rust_xlsxwriter::{Format, Workbook};

use crate::db::models::{personas::PersonaRow, registros::RegistroRow};
use crate::errors::Error;

/// Export format selected via the `format` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    /// Recognize an export request; anything else means a JSON response.
    pub fn from_param(format: Option<&str>) -> Option<Self> {
        match format {
            Some("csv") => Some(ExportFormat::Csv),
            Some("xlsx") => Some(ExportFormat::Xlsx),
            _ => None,
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }

    pub fn filename(self, base: &str) -> String {
        match self {
            ExportFormat::Csv => format!("{base}.csv"),
            ExportFormat::Xlsx => format!("{base}.xlsx"),
        }
    }
}

/// One column of an export sheet.
pub struct Column {
    pub header: &'static str,
    pub width: f64,
}

/// A fully materialized export: column definitions plus stringified rows.
pub struct Sheet {
    pub name: &'static str,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<String>>,
}

fn opt(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn date(value: Option<NaiveDate>) -> String {
    value.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
}

fn datetime(value: DateTime<Utc>) -> String {
    value.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn personas_sheet(rows: &[PersonaRow]) -> Sheet {
    Sheet {
        name: "Personas Registradas",
        columns: vec![
            Column { header: "ID", width: 10.0 },
            Column { header: "Apellido", width: 20.0 },
            Column { header: "Nombre", width: 20.0 },
            Column { header: "DNI", width: 12.0 },
            Column { header: "Fecha Nacimiento", width: 18.0 },
            Column { header: "Nacionalidad", width: 15.0 },
            Column { header: "Dirección", width: 30.0 },
            Column { header: "Teléfono", width: 15.0 },
            Column { header: "Email", width: 25.0 },
            Column { header: "Comisaría", width: 20.0 },
            Column { header: "Observaciones", width: 30.0 },
        ],
        rows: rows
            .iter()
            .map(|p| {
                vec![
                    p.id.to_string(),
                    p.apellido.clone(),
                    p.nombre.clone(),
                    p.dni.clone(),
                    date(p.fecha_nacimiento),
                    opt(&p.nacionalidad),
                    opt(&p.direccion),
                    opt(&p.telefono),
                    opt(&p.email),
                    opt(&p.comisaria),
                    opt(&p.observaciones),
                ]
            })
            .collect(),
    }
}

pub fn registros_sheet(rows: &[RegistroRow]) -> Sheet {
    Sheet {
        name: "Registros Delictuales",
        columns: vec![
            Column { header: "ID", width: 10.0 },
            Column { header: "Persona ID", width: 12.0 },
            Column { header: "Tipo de delito", width: 25.0 },
            Column { header: "Lugar", width: 20.0 },
            Column { header: "Estado", width: 18.0 },
            Column { header: "Juzgado", width: 20.0 },
            Column { header: "Detalle", width: 40.0 },
            Column { header: "Creado", width: 20.0 },
        ],
        rows: rows
            .iter()
            .map(|r| {
                vec![
                    r.id.to_string(),
                    r.persona_id.to_string(),
                    r.tipo_delito.clone(),
                    opt(&r.lugar),
                    opt(&r.estado),
                    opt(&r.juzgado),
                    opt(&r.detalle),
                    datetime(r.created_at),
                ]
            })
            .collect(),
    }
}

/// Flatten a value into a CSV-safe field: newline runs become one space and
/// the delimiter is replaced with a comma.
fn csv_field(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_newline_run = false;
    for c in value.chars() {
        match c {
            '\r' | '\n' => {
                if !in_newline_run {
                    out.push(' ');
                    in_newline_run = true;
                }
            }
            ';' => {
                out.push(',');
                in_newline_run = false;
            }
            c => {
                out.push(c);
                in_newline_run = false;
            }
        }
    }
    out
}

pub fn to_csv(sheet: &Sheet) -> Vec<u8> {
    let mut out = String::new();
    // BOM for Excel compatibility
    out.push('\u{feff}');

    let headers: Vec<&str> = sheet.columns.iter().map(|c| c.header).collect();
    out.push_str(&headers.join(";"));
    out.push('\n');

    for row in &sheet.rows {
        let line: Vec<String> = row.iter().map(|v| csv_field(v)).collect();
        out.push_str(&line.join(";"));
        out.push('\n');
    }

    out.into_bytes()
}

pub fn to_xlsx(sheet: &Sheet) -> Result<Vec<u8>, Error> {
    let internal = |e: rust_xlsxwriter::XlsxError| Error::Internal {
        operation: format!("render xlsx: {e}"),
    };

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet.name).map_err(internal)?;

    let bold = Format::new().set_bold();
    for (col, column) in sheet.columns.iter().enumerate() {
        let col = col as u16;
        worksheet.write_string_with_format(0, col, column.header, &bold).map_err(internal)?;
        worksheet.set_column_width(col, column.width.max(10.0)).map_err(internal)?;
    }

    for (row_idx, row) in sheet.rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string((row_idx + 1) as u32, col_idx as u16, value)
                .map_err(internal)?;
        }
    }

    workbook.save_to_buffer().map_err(internal)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet_with_rows(rows: Vec<Vec<String>>) -> Sheet {
        Sheet {
            name: "Prueba",
            columns: vec![
                Column { header: "Uno", width: 10.0 },
                Column { header: "Dos", width: 10.0 },
            ],
            rows,
        }
    }

    #[test]
    fn csv_starts_with_bom_and_header_row() {
        let bytes = to_csv(&sheet_with_rows(vec![]));
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with('\u{feff}'));
        assert_eq!(text.trim_start_matches('\u{feff}'), "Uno;Dos\n");
    }

    #[test]
    fn csv_flattens_newlines_and_replaces_semicolons() {
        let bytes = to_csv(&sheet_with_rows(vec![vec![
            "línea1\r\nlínea2".to_string(),
            "a;b".to_string(),
        ]]));
        let text = String::from_utf8(bytes).unwrap();
        let data_line = text.lines().nth(1).unwrap();
        assert_eq!(data_line, "línea1 línea2;a,b");
    }

    #[test]
    fn csv_field_collapses_newline_runs_to_one_space() {
        assert_eq!(csv_field("a\n\n\nb"), "a b");
        assert_eq!(csv_field("a\r\nb"), "a b");
        assert_eq!(csv_field("sin cambios"), "sin cambios");
    }

    #[test]
    fn xlsx_renders_a_zip_container() {
        let sheet = sheet_with_rows(vec![vec!["hola".to_string(), "mundo".to_string()]]);
        let bytes = to_xlsx(&sheet).unwrap();
        // XLSX is a zip archive
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn format_from_param() {
        assert_eq!(ExportFormat::from_param(Some("csv")), Some(ExportFormat::Csv));
        assert_eq!(ExportFormat::from_param(Some("xlsx")), Some(ExportFormat::Xlsx));
        assert_eq!(ExportFormat::from_param(Some("pdf")), None);
        assert_eq!(ExportFormat::from_param(None), None);
        assert_eq!(ExportFormat::Csv.filename("personas"), "personas.csv");
    }
}

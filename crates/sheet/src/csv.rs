use crate::cell::CellValue;
use crate::error::Result;
use crate::sheet::Sheet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// CSV reader/writer options
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Field delimiter (default: ',')
    pub delimiter: u8,
    /// Quote character (default: '"')
    pub quote: u8,
    /// Leading rows to drop before the header row
    pub skip_rows: usize,
}

impl Default for CsvOptions {
    fn default() -> Self {
        CsvOptions {
            delimiter: b',',
            quote: b'"',
            skip_rows: 0,
        }
    }
}

impl CsvOptions {
    /// Create options for TSV (tab-separated values)
    #[must_use]
    pub fn tsv() -> Self {
        CsvOptions {
            delimiter: b'\t',
            ..Default::default()
        }
    }

    /// Set the number of leading rows to skip
    #[must_use]
    pub fn with_skip_rows(mut self, skip_rows: usize) -> Self {
        self.skip_rows = skip_rows;
        self
    }
}

impl Sheet {
    /// Load a sheet from a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_csv_with_options(path, CsvOptions::default())
    }

    /// Load a sheet from a CSV file with custom options
    pub fn from_csv_with_options<P: AsRef<Path>>(path: P, options: CsvOptions) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let reader = BufReader::new(file);
        let mut sheet = Self::from_csv_reader(reader, options)?;
        if let Some(stem) = path.as_ref().file_stem().and_then(|s| s.to_str()) {
            sheet.set_name(stem);
        }
        Ok(sheet)
    }

    /// Load a sheet from a CSV string
    pub fn from_csv_str(content: &str) -> Result<Self> {
        Self::from_csv_str_with_options(content, CsvOptions::default())
    }

    /// Load a sheet from a CSV string with custom options
    pub fn from_csv_str_with_options(content: &str, options: CsvOptions) -> Result<Self> {
        Self::from_csv_reader(content.as_bytes(), options)
    }

    /// Load a sheet from a reader
    pub fn from_csv_reader<R: Read>(reader: R, options: CsvOptions) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(options.delimiter)
            .quote(options.quote)
            .has_headers(false) // header row is handled by the normalizer
            .flexible(true)
            .from_reader(reader);

        let mut data: Vec<Vec<CellValue>> = Vec::new();

        for result in csv_reader.records() {
            let record = result?;
            let row: Vec<CellValue> = record.iter().map(CellValue::parse).collect();
            data.push(row);
        }

        let mut sheet = Sheet::with_name("Sheet1");
        *sheet.data_mut() = data;
        sheet.skip_rows(options.skip_rows);

        Ok(sheet)
    }

    /// Save the sheet to a CSV file
    pub fn save_as_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.save_as_csv_with_options(path, CsvOptions::default())
    }

    /// Save the sheet to a CSV file with custom options
    pub fn save_as_csv_with_options<P: AsRef<Path>>(
        &self,
        path: P,
        options: CsvOptions,
    ) -> Result<()> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        self.write_csv(writer, options)
    }

    /// Write the sheet to a writer as CSV
    pub fn write_csv<W: Write>(&self, writer: W, options: CsvOptions) -> Result<()> {
        let mut csv_writer = csv::WriterBuilder::new()
            .delimiter(options.delimiter)
            .quote(options.quote)
            .flexible(true)
            .from_writer(writer);

        for row in self.data() {
            let record: Vec<String> = row.iter().map(csv_field).collect();
            csv_writer.write_record(&record)?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Convert the sheet to a CSV string
    pub fn to_csv_string(&self) -> Result<String> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer, CsvOptions::default())?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Date cells without a time component are written as plain dates
fn csv_field(cell: &CellValue) -> String {
    match cell {
        CellValue::DateTime(dt) if dt.time() == chrono::NaiveTime::MIN => {
            dt.format("%Y-%m-%d").to_string()
        }
        other => other.as_str(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    #[test]
    fn test_from_csv_str() {
        let csv = "County,Cases 08/10\nHarris,100\nTravis,--";
        let sheet = Sheet::from_csv_str(csv).unwrap();

        assert_eq!(sheet.row_count(), 3);
        assert_eq!(sheet.col_count(), 2);
        assert_eq!(sheet.cell(1, 1), &CellValue::Int(100));
        assert_eq!(sheet.cell(2, 1), &CellValue::String("--".to_string()));
    }

    #[test]
    fn test_quoted_multiline_header() {
        let csv = "County,\"Cases\n08/15/2020*\"\nHarris,1";
        let sheet = Sheet::from_csv_str(csv).unwrap();
        assert_eq!(
            sheet.cell(0, 1),
            &CellValue::String("Cases\n08/15/2020*".to_string())
        );
    }

    #[test]
    fn test_skip_rows_and_ragged() {
        let csv = "Texas COVID-19 county data\nCounty,a,b\nHarris,1";
        let options = CsvOptions::default().with_skip_rows(1);
        let sheet = Sheet::from_csv_str_with_options(csv, options).unwrap();

        assert_eq!(sheet.row_count(), 2);
        assert_eq!(sheet.origin_row(), 1);
        assert_eq!(sheet.cell(1, 2), &CellValue::Null);
        assert_eq!(sheet.cell_ref(1, 2), "C3");
    }

    #[test]
    fn test_tsv() {
        let tsv = "County\t2020-08-10\nHarris\t100";
        let sheet = Sheet::from_csv_str_with_options(tsv, CsvOptions::tsv()).unwrap();
        assert_eq!(sheet.cell(0, 1), &CellValue::from("2020-08-10"));
    }

    #[test]
    fn test_write_dates_without_time() {
        let date = NaiveDate::from_ymd_opt(2020, 8, 16).unwrap();
        let sheet = Sheet::from_data(vec![
            vec![CellValue::from("entity"), CellValue::from(date)],
            vec![CellValue::from("Harris"), CellValue::Null],
        ]);

        assert_eq!(sheet.to_csv_string().unwrap(), "entity,2020-08-16\nHarris,\n");
    }

    #[test]
    fn test_save_and_load_csv_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("cases.csv");

        let sheet = Sheet::from_data(vec![vec![1, 2], vec![3, 4]]);
        sheet.save_as_csv(&file_path).unwrap();

        let loaded = Sheet::from_csv(&file_path).unwrap();
        assert_eq!(loaded.name(), "cases");
        assert_eq!(loaded.data(), sheet.data());
    }
}

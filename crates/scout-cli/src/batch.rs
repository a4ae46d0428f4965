use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use scout_core::models::{CompanyInfo, EnrichmentOutcome};
use serde::Serialize;

/// One input row: `name,linkedin_url`. The URL column is optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyRow {
    pub name: String,
    pub linkedin_url: String,
}

impl CompanyRow {
    fn from_record(record: &csv::StringRecord) -> Self {
        Self {
            name: record.get(0).unwrap_or_default().to_string(),
            linkedin_url: record.get(1).unwrap_or_default().to_string(),
        }
    }
}

/// One output row. `found` is false when no source produced a profile.
#[derive(Debug, Serialize)]
pub struct ResultRow {
    pub input_name: String,
    pub found: bool,
    pub name: String,
    pub description: String,
    pub website: String,
    pub industry: String,
    pub company_size: String,
    pub headquarters: String,
    pub specialties: String,
    pub logo_url: String,
    pub career_page_url: String,
    pub linkedin_url: String,
    pub last_crawled_at: String,
}

impl ResultRow {
    pub fn new(row: &CompanyRow, outcome: &EnrichmentOutcome) -> Self {
        match outcome {
            EnrichmentOutcome::Success(info) => Self::found(row, info),
            EnrichmentOutcome::Empty => Self {
                input_name: row.name.clone(),
                found: false,
                name: String::new(),
                description: String::new(),
                website: String::new(),
                industry: String::new(),
                company_size: String::new(),
                headquarters: String::new(),
                specialties: String::new(),
                logo_url: String::new(),
                career_page_url: String::new(),
                linkedin_url: row.linkedin_url.clone(),
                last_crawled_at: String::new(),
            },
        }
    }

    fn found(row: &CompanyRow, info: &CompanyInfo) -> Self {
        Self {
            input_name: row.name.clone(),
            found: true,
            name: info.name.clone(),
            description: info.description.clone(),
            website: info.website.clone(),
            industry: info.industry.clone(),
            company_size: info.company_size.clone(),
            headquarters: info.headquarters.clone(),
            specialties: info.specialties.clone(),
            logo_url: info.logo_url.clone(),
            career_page_url: info.career_page_url.clone(),
            linkedin_url: if info.linkedin_url.is_empty() {
                row.linkedin_url.clone()
            } else {
                info.linkedin_url.clone()
            },
            last_crawled_at: info.last_crawled_at.to_rfc3339(),
        }
    }
}

/// Reads company rows from a CSV with a `name,linkedin_url` header.
///
/// Rows with a blank name or that cannot be read are logged and skipped.
pub fn read_rows(path: &Path) -> Result<Vec<CompanyRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open input file: {}", path.display()))?;

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let line = i + 2;
        let row = match record {
            Ok(record) => CompanyRow::from_record(&record),
            Err(e) => {
                tracing::warn!(line, error = %e, "Skipping unreadable row");
                continue;
            }
        };
        if row.name.is_empty() {
            tracing::warn!(line, "Skipping row without company name");
            continue;
        }
        rows.push(row);
    }
    Ok(rows)
}

/// CSV sink for results, either a file or stdout.
pub struct ResultWriter {
    inner: csv::Writer<Box<dyn io::Write>>,
}

impl ResultWriter {
    pub fn create(path: Option<&Path>) -> Result<Self> {
        let sink: Box<dyn io::Write> = match path {
            Some(p) => Box::new(
                std::fs::File::create(p)
                    .with_context(|| format!("Failed to create output file: {}", p.display()))?,
            ),
            None => Box::new(io::stdout()),
        };
        Ok(Self {
            inner: csv::Writer::from_writer(sink),
        })
    }

    pub fn write(&mut self, row: &ResultRow) -> Result<()> {
        self.inner.serialize(row).context("Failed to write result row")?;
        self.inner.flush().context("Failed to flush results")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use scout_core::testutil::make_company;

    use super::*;

    #[test]
    fn test_read_rows() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name,linkedin_url").unwrap();
        writeln!(file, "Acme, https://www.linkedin.com/company/acme").unwrap();
        writeln!(file, "Globex").unwrap();
        writeln!(file, "  ,https://www.linkedin.com/company/nobody").unwrap();
        file.flush().unwrap();

        let rows = read_rows(file.path()).unwrap();

        assert_eq!(
            rows,
            vec![
                CompanyRow {
                    name: "Acme".into(),
                    linkedin_url: "https://www.linkedin.com/company/acme".into(),
                },
                CompanyRow {
                    name: "Globex".into(),
                    linkedin_url: String::new(),
                },
            ]
        );
    }

    #[test]
    fn test_read_rows_skips_unreadable_row() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"name,linkedin_url\nAcme\n\xff\xfe,bad\nInitech,https://www.linkedin.com/company/initech\n")
            .unwrap();
        file.flush().unwrap();

        let rows = read_rows(file.path()).unwrap();

        let names: Vec<_> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Acme", "Initech"]);
        assert_eq!(rows[0].linkedin_url, "");
        assert_eq!(
            rows[1].linkedin_url,
            "https://www.linkedin.com/company/initech"
        );
    }

    #[test]
    fn test_read_rows_missing_file() {
        let err = read_rows(Path::new("/nonexistent/companies.csv")).unwrap_err();
        assert!(err.to_string().contains("Failed to open input file"));
    }

    #[test]
    fn test_write_results() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.csv");
        let acme = CompanyRow {
            name: "Acme".into(),
            linkedin_url: "https://www.linkedin.com/company/acme".into(),
        };
        let globex = CompanyRow {
            name: "Globex".into(),
            linkedin_url: String::new(),
        };

        {
            let mut writer = ResultWriter::create(Some(&out)).unwrap();
            writer
                .write(&ResultRow::new(
                    &acme,
                    &EnrichmentOutcome::Success(make_company("Acme")),
                ))
                .unwrap();
            writer
                .write(&ResultRow::new(&globex, &EnrichmentOutcome::Empty))
                .unwrap();
        }

        let written = std::fs::read_to_string(&out).unwrap();
        let lines: Vec<_> = written.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("input_name,found,name,description"));
        assert!(lines[1].starts_with("Acme,true,Acme,Acme makes things"));
        assert!(lines[1].contains("https://www.linkedin.com/company/acme"));
        assert!(lines[2].starts_with("Globex,false,"));
    }
}

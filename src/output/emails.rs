//! Emails CSV output

use crate::email::EmailSet;
use crate::HarvestError;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Column header of the emails CSV
pub const EMAIL_CSV_HEADER: [&str; 3] = ["Email", "Source URL", "Webpage Title"];

/// Writes one CSV row per record, after the header
pub fn write_emails_csv<W: Write>(writer: W, emails: &EmailSet) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(EMAIL_CSV_HEADER)?;

    for record in emails {
        csv_writer.write_record([
            record.address.as_str(),
            record.source_url.as_str(),
            record.context.as_str(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Writes the emails CSV to `path`, replacing any existing file
pub fn save_emails_csv(path: &Path, emails: &EmailSet) -> Result<(), HarvestError> {
    let file = File::create(path)?;
    write_emails_csv(file, emails)?;
    tracing::info!("Wrote {} email records to {}", emails.len(), path.display());
    Ok(())
}

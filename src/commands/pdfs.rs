//! PDF management commands

use std::path::Path;

use colored::Colorize;
use prettytable::{format, Table};

use crate::config::Config;
use crate::error::Result;

/// Upload a PDF to use as retrieval context
pub async fn upload(config: &Config, file: &Path) -> Result<()> {
    let client = crate::commands::build_client(config)?;
    let pdf = client.upload_pdf(file).await?;
    println!(
        "{}",
        format!("Uploaded \"{}\" as PDF {}", pdf.name, pdf.id).green()
    );
    Ok(())
}

/// List the signed-in user's uploaded PDFs
pub async fn list(config: &Config, json: bool) -> Result<()> {
    let client = crate::commands::build_client(config)?;
    let pdfs = client.list_pdfs().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&pdfs)?);
        return Ok(());
    }

    if pdfs.is_empty() {
        println!("{}", "No PDFs uploaded yet.".yellow());
        return Ok(());
    }

    print_pdf_table(&pdfs);
    Ok(())
}

/// Attach a PDF to a session on the server
pub async fn attach(config: &Config, session_id: i64, pdf_id: i64) -> Result<()> {
    let client = crate::commands::build_client(config)?;
    client.attach_pdf(session_id, pdf_id).await?;
    println!(
        "{}",
        format!("Attached PDF {} to session {}", pdf_id, session_id).green()
    );
    Ok(())
}

/// Detach a PDF from a session on the server
pub async fn detach(config: &Config, session_id: i64, pdf_id: i64) -> Result<()> {
    let client = crate::commands::build_client(config)?;
    client.detach_pdf(session_id, pdf_id).await?;
    println!(
        "{}",
        format!("Detached PDF {} from session {}", pdf_id, session_id).green()
    );
    Ok(())
}

/// List the PDFs attached to a session
pub async fn session_pdfs(config: &Config, session_id: i64) -> Result<()> {
    let client = crate::commands::build_client(config)?;
    let pdfs = client.session_pdfs(session_id).await?;

    if pdfs.is_empty() {
        println!(
            "{}",
            format!("No PDFs attached to session {}.", session_id).yellow()
        );
        return Ok(());
    }

    print_pdf_table(&pdfs);
    Ok(())
}

fn print_pdf_table(pdfs: &[crate::api::PdfDocument]) {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

    table.add_row(prettytable::row![
        "ID".bold(),
        "Name".bold(),
        "Uploaded".bold()
    ]);

    for pdf in pdfs {
        let uploaded = pdf.created_at.format("%Y-%m-%d %H:%M").to_string();
        table.add_row(prettytable::row![
            pdf.id.to_string().cyan(),
            pdf.name,
            uploaded
        ]);
    }

    println!();
    table.printstd();
    println!();
}

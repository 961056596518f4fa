use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use crossterm::style::Stylize;
use openlibrary_sync::store::{BookEntity, EntityStore};
use openlibrary_sync::BookRecord;

const HEADERS: [&str; 4] = ["Title", "Author(s)", "First published", "Description"];
const DESCRIPTION_PREVIEW: usize = 60;

fn header_row() -> Vec<Cell> {
    HEADERS
        .iter()
        .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
        .collect()
}

fn preview(text: &str) -> String {
    if text.chars().count() <= DESCRIPTION_PREVIEW {
        text.to_string()
    } else {
        let head: String = text.chars().take(DESCRIPTION_PREVIEW).collect();
        format!("{}…", head)
    }
}

pub fn display_records(records: &[BookRecord]) {
    if records.is_empty() {
        println!("{}", "No results found.".yellow());
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header_row());

    for record in records {
        table.add_row(vec![
            record.title.clone(),
            record.author.to_string(),
            record.first_publish_year.to_string(),
            preview(&record.description),
        ]);
    }

    println!("{table}");
    println!("\n{}", format!("{} records returned", records.len()).green());
}

pub fn display_books<S: EntityStore>(books: &[BookEntity], store: &S) -> anyhow::Result<()> {
    if books.is_empty() {
        println!("{}", "No books stored yet.".yellow());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    let mut headers = vec![Cell::new("Id").add_attribute(Attribute::Bold)];
    headers.extend(header_row());
    table.set_header(headers);

    for book in books {
        let mut authors = Vec::with_capacity(book.author_refs.len());
        for term_id in &book.author_refs {
            match store.load_term(*term_id)? {
                Some(term) => authors.push(term.name),
                None => authors.push(format!("#{}", term_id)),
            }
        }

        table.add_row(vec![
            book.id.to_string(),
            book.title.clone(),
            authors.join(", "),
            book.first_publish_year.to_string(),
            preview(&book.body.value),
        ]);
    }

    println!("{table}");
    println!("\n{}", format!("{} books stored", books.len()).green());
    Ok(())
}

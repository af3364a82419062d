//! Snippets indexed for uploaded datasets

/// Describe a dataset the way the ingestion pipeline indexes it
///
/// ```
/// use tenant_rag::retrieval::describe_dataset;
///
/// assert_eq!(
///     describe_dataset("sales.csv", &["date", "region", "amount"]),
///     "Dataset sales.csv with columns: date, region, amount"
/// );
/// ```
pub fn describe_dataset<S: AsRef<str>>(name: &str, columns: &[S]) -> String {
    let columns: Vec<&str> = columns.iter().map(AsRef::as_ref).collect();
    format!("Dataset {} with columns: {}", name, columns.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_columns() {
        let empty: [&str; 0] = [];
        assert_eq!(describe_dataset("empty.csv", &empty), "Dataset empty.csv with columns: ");
    }

    #[test]
    fn test_owned_columns() {
        let columns = vec!["sku".to_string(), "qty".to_string()];
        assert_eq!(
            describe_dataset("inventory.csv", &columns),
            "Dataset inventory.csv with columns: sku, qty"
        );
    }
}

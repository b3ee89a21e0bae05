//! Directory subcommands. Each prints one JSON document on stdout.

use crate::cli::{open_store, Cli, Command};
use callmark_directory::{CallerDirectory, CallerDirectoryApi, CallerRecord};
use serde_json::{json, Value};
use std::sync::Arc;

pub async fn execute(cli: &Cli, command: Command) -> anyhow::Result<()> {
    let store = Arc::new(open_store(cli)?);
    let directory = CallerDirectory::new(store);
    let output = dispatch(&directory, command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn dispatch(directory: &CallerDirectory, command: Command) -> anyhow::Result<Value> {
    let value = match command {
        Command::Add {
            number,
            name,
            country_code,
            appointment,
            city,
            ios_row,
            rename_from,
        } => {
            let ok = match rename_from {
                Some(original) => {
                    let record = CallerRecord {
                        phone_number: number,
                        country_code,
                        name,
                        appointment,
                        city,
                        ios_row,
                    };
                    directory.update(&original, record).await
                }
                None => {
                    directory
                        .upsert(&number, &country_code, &name, &appointment, &city, &ios_row)
                        .await
                }
            };
            json!({ "ok": ok })
        }
        Command::Get { number } => serde_json::to_value(directory.lookup(&number).await)?,
        Command::Remove { number } => json!({ "removed": directory.remove(&number).await }),
        Command::List => serde_json::to_value(directory.list_all().await)?,
        Command::Numbers => serde_json::to_value(directory.list_keys().await)?,
        Command::Clear => json!({ "ok": directory.clear().await }),
        Command::Run => anyhow::bail!("`run` is not a directory command"),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use callmark_directory::DirectoryStore;

    fn directory() -> CallerDirectory {
        CallerDirectory::new(Arc::new(DirectoryStore::open_in_memory().unwrap()))
    }

    fn add(number: &str, name: &str) -> Command {
        Command::Add {
            number: number.to_string(),
            name: name.to_string(),
            country_code: String::new(),
            appointment: String::new(),
            city: "Riga".to_string(),
            ios_row: String::new(),
            rename_from: None,
        }
    }

    #[tokio::test]
    async fn test_add_get_list() {
        let directory = directory();

        let out = dispatch(&directory, add("15551234567", "Alice")).await.unwrap();
        assert_eq!(out, json!({ "ok": true }));

        let out = dispatch(
            &directory,
            Command::Get {
                number: "+15551234567".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(out["name"], "Alice");
        assert_eq!(out["phoneNumber"], "15551234567");
        assert_eq!(out["city"], "Riga");

        let out = dispatch(&directory, Command::Numbers).await.unwrap();
        assert_eq!(out, json!(["15551234567"]));

        let out = dispatch(&directory, Command::List).await.unwrap();
        assert_eq!(out.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_missing_is_null() {
        let out = dispatch(
            &directory(),
            Command::Get {
                number: "1".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(out, Value::Null);
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let directory = directory();
        dispatch(&directory, add("1", "Alice")).await.unwrap();
        dispatch(&directory, add("2", "Bob")).await.unwrap();

        let out = dispatch(
            &directory,
            Command::Remove {
                number: "1".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(out, json!({ "removed": true }));

        let out = dispatch(
            &directory,
            Command::Remove {
                number: "1".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(out, json!({ "removed": false }));

        dispatch(&directory, Command::Clear).await.unwrap();
        let out = dispatch(&directory, Command::List).await.unwrap();
        assert_eq!(out, json!([]));
    }

    #[tokio::test]
    async fn test_rename_moves_caller() {
        let directory = directory();
        dispatch(&directory, add("1", "Alice")).await.unwrap();

        let mut renamed = add("2", "Alice");
        if let Command::Add { rename_from, .. } = &mut renamed {
            *rename_from = Some("1".to_string());
        }
        dispatch(&directory, renamed).await.unwrap();

        let out = dispatch(&directory, Command::Numbers).await.unwrap();
        assert_eq!(out, json!(["2"]));
    }

    #[tokio::test]
    async fn test_run_is_rejected() {
        assert!(dispatch(&directory(), Command::Run).await.is_err());
    }
}

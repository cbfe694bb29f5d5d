#[macro_use]
extern crate error_chain;

pub mod apply;
pub mod config;
pub mod manager;
pub mod retry;
pub mod schema;
pub mod stack;
pub mod status;
pub mod store;
pub mod upgrade;
pub mod warnings;

pub mod errors {
    // Create the Error, ErrorKind, ResultExt, and Result types
    error_chain! {
        foreign_links {
            Io(std::io::Error);
            Kube(kube::Error);
            Yaml(serde_yaml::Error);
            Json(serde_json::Error);
        }

        errors {
            NotFound(key: String) {
                description("logstack not found")
                display("logstack {} not found", key)
            }
            Conflict(key: String) {
                description("logstack was modified concurrently")
                display("conflicting update of logstack {}", key)
            }
            InvalidEffectiveDate(date: String) {
                description("invalid schema effective date")
                display("invalid schema effective date '{}', expected YYYY-MM-DD", date)
            }
            DuplicateEffectiveDate(date: String) {
                description("duplicate schema effective date")
                display("more than one schema takes effect on {}", date)
            }
            InvalidSchemaVersion(version: String) {
                description("invalid schema version")
                display("invalid schema version '{}'", version)
            }
            Timeout(op: String) {
                description("operation timed out")
                display("timed out during {}", op)
            }
        }
    }

    impl Error {
        /// The object is gone; lifecycle handling treats this as done.
        pub fn is_not_found(&self) -> bool {
            matches!(self.kind(), ErrorKind::NotFound(_))
        }

        pub fn is_conflict(&self) -> bool {
            matches!(self.kind(), ErrorKind::Conflict(_))
        }
    }
}

/*
Storage schema lifecycle for LogStacks.

Each reconciliation runs two phases against a freshly fetched object:

- apply: if a proposed upgrade is due, automatic upgrades are allowed and the
  stack is Ready, write the proposed schema list into the spec.
  - Writes are compare-and-swap on resourceVersion. Conflicts refetch and retry
    a bounded number of times.

- status: recompute per-schema lifecycle (future/in-use/obsolete) from the spec,
  propose the next upgrade if the stack is not on the target version, and
  surface warnings as conditions.
  - A proposal stays untouched while its upgrade time is in the future, so the
    countdown users see never moves.

Examples (target v13, now 2023-12-01):
  - [v12@2023-01-01] -> propose [v12@2023-01-01, v13@2023-12-06], apply at 2023-12-04.
  - [v11@2023-01-01, v12@2023-12-03] -> the future v12 is cut off and replaced by
    v13@2023-12-06.
  - [v13@2022-12-01 (obsolete), v13@2023-01-01] -> propose [v13@2023-01-01].
*/

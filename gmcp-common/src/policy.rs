//! Argument safety policy for Gradle invocations.
//!
//! Every caller-supplied argument is classified against two disjoint,
//! process-wide, immutable sets before any process is spawned: an allow-list
//! of safe arguments and a deny-list of arguments that can reach the
//! filesystem or execute arbitrary code. Anything in neither set is rejected
//! (fail-closed): the Gradle CLI surface evolves independently of this
//! policy, so unrecognized input must never pass silently.
//!
//! The allow-list is the actual security boundary; the deny-list is
//! documentation layered on top of it. Moving an argument between sets is a
//! code change, never a runtime operation.

use std::sync::OnceLock;
use thiserror::Error;

// ── Safety Policy ────────────────────────────────────────────────────────

/// Allow-list of Gradle arguments that `run_task` may forward verbatim.
pub static SAFE_ARGS: &[&str] = &[
    // Logging options
    "--debug",
    "-d",
    "--info",
    "-i",
    "--warn",
    "-w",
    "--quiet",
    "-q",
    "--stacktrace",
    "-s",
    "--full-stacktrace",
    "-S",
    "--scan",
    "--no-scan",
    // Performance options
    "--build-cache",
    "--no-build-cache",
    "--configure-on-demand",
    "--no-configure-on-demand",
    "--max-workers",
    "--parallel",
    "--no-parallel",
    // Execution options
    "--continue",
    "--dry-run",
    "-m",
    "--refresh-dependencies",
    "--rerun-tasks",
    "--profile",
    // Task exclusion (safe: only limits what runs)
    "-x",
    "--exclude-task",
    // Daemon options
    "--daemon",
    "--no-daemon",
    "--foreground",
    "--stop",
    "--status",
];

/// Deny-list of arguments that can execute arbitrary code or touch
/// arbitrary paths. Matched exactly, as `--flag=value`, and by fused
/// two-character short form (`-Pkey=value`).
pub static DANGEROUS_ARGS: &[&str] = &[
    "--init-script",
    "-I", // executes arbitrary Groovy/Kotlin
    "--project-prop",
    "-P",
    "--system-prop",
    "-D",
    "--settings-file",
    "-c",
    "--build-file",
    "-b",
    "--gradle-user-home",
    "-g",
    "--project-dir",
    "-p",
    "--include-build",
    "--write-verification-metadata",
];

/// Safe arguments that pair with a following bare value token
/// (`--max-workers 4`, `-x test`).
static VALUE_TAKING_ARGS: &[&str] = &["--max-workers", "-x", "--exclude-task"];

fn allowed_list() -> &'static str {
    static LIST: OnceLock<String> = OnceLock::new();
    LIST.get_or_init(|| {
        let mut sorted: Vec<&str> = SAFE_ARGS.to_vec();
        sorted.sort_unstable();
        sorted.join(", ")
    })
}

// ── Violations ───────────────────────────────────────────────────────────

/// A rejected argument vector. No process is spawned once this is raised.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PolicyViolation {
    /// The token matched the deny-list (exact, `=`-form, or fused prefix).
    #[error(
        "Argument '{arg}' is not allowed due to security concerns. \
         It could enable arbitrary code execution or unauthorized file access."
    )]
    Dangerous { arg: String },

    /// The token matched neither set. Unknown input is rejected, not
    /// warned-and-allowed.
    #[error(
        "Argument '{arg}' is not in the allow-list of safe Gradle arguments. \
         Allowed arguments are: {}",
        allowed_list()
    )]
    Unrecognized { arg: String },
}

impl PolicyViolation {
    /// The offending token.
    #[must_use]
    pub fn argument(&self) -> &str {
        match self {
            Self::Dangerous { arg } | Self::Unrecognized { arg } => arg,
        }
    }
}

// ── Classification ───────────────────────────────────────────────────────

/// Verdict for a single token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentClass {
    /// Forwarded verbatim. `takes_value` marks flags that consume a
    /// following bare token as their paired value.
    Safe { takes_value: bool },
    /// Deny-listed.
    Dangerous,
    /// In neither set (includes empty and non-flag tokens).
    Unrecognized,
}

/// Classify one raw token against the policy.
///
/// Lookup order mirrors the deny-first contract: exact deny-list match,
/// then `--flag=value` and fused `-Xvalue` forms of deny-listed names, then
/// exact allow-list match, then `--flag=value` with an allow-listed name.
/// Fused values are never decomposed further; the prefix alone decides.
#[must_use]
pub fn classify_arg(arg: &str) -> ArgumentClass {
    if DANGEROUS_ARGS.contains(&arg) {
        return ArgumentClass::Dangerous;
    }

    for dangerous in DANGEROUS_ARGS {
        if let Some(rest) = arg.strip_prefix(dangerous)
            && (rest.starts_with('=') || (dangerous.len() == 2 && !rest.is_empty()))
        {
            return ArgumentClass::Dangerous;
        }
    }

    if SAFE_ARGS.contains(&arg) {
        return ArgumentClass::Safe {
            takes_value: VALUE_TAKING_ARGS.contains(&arg),
        };
    }

    // `--flag=value` (or `-x=value`) with the value already attached.
    if let Some((name, _value)) = arg.split_once('=')
        && SAFE_ARGS.contains(&name)
    {
        return ArgumentClass::Safe { takes_value: false };
    }

    ArgumentClass::Unrecognized
}

/// Validate a whole argument vector left to right.
///
/// Pure and idempotent: same input, same verdict, no side effects. The scan
/// keeps no cross-token state beyond recognizing the two-token
/// `--flag value` form for value-taking safe flags; the paired value is
/// consumed without separate classification. An empty vector is valid.
pub fn validate_args<S: AsRef<str>>(args: &[S]) -> Result<(), PolicyViolation> {
    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_ref();
        match classify_arg(arg) {
            ArgumentClass::Dangerous => {
                return Err(PolicyViolation::Dangerous {
                    arg: arg.to_string(),
                });
            }
            ArgumentClass::Unrecognized => {
                return Err(PolicyViolation::Unrecognized {
                    arg: arg.to_string(),
                });
            }
            ArgumentClass::Safe { takes_value } => {
                if takes_value
                    && let Some(next) = args.get(i + 1)
                    && !next.as_ref().starts_with('-')
                {
                    i += 1;
                }
            }
        }
        i += 1;
    }
    Ok(())
}

// ── Cleaning Gate ────────────────────────────────────────────────────────

/// Check whether a task name belongs to the cleaning family.
///
/// Case-insensitive: names starting or ending with `clean` (the `clean`,
/// `cleanBuild*`, `cleanTest*`, `*Clean` spellings Gradle conventions
/// produce). `run_task` refuses these and steers the caller to the
/// dedicated clean entry point.
#[must_use]
pub fn is_cleaning_task(task: &str) -> bool {
    let lower = task.to_lowercase();
    lower.starts_with("clean") || lower.ends_with("clean")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_safe_arg_accepted_individually() {
        for arg in SAFE_ARGS {
            assert!(
                validate_args(&[*arg]).is_ok(),
                "safe arg '{arg}' was rejected"
            );
        }
    }

    #[test]
    fn test_every_dangerous_arg_rejected_individually() {
        for arg in DANGEROUS_ARGS {
            let err = validate_args(&[*arg]).unwrap_err();
            assert_eq!(err.argument(), *arg);
            assert!(matches!(err, PolicyViolation::Dangerous { .. }));
        }
    }

    #[test]
    fn test_safe_combinations() {
        assert!(validate_args(&["--info", "--stacktrace"]).is_ok());
        assert!(validate_args(&["--parallel", "--build-cache", "--continue"]).is_ok());
        assert!(validate_args(&["-q", "-s", "-m"]).is_ok());
    }

    #[test]
    fn test_value_taking_separate_token() {
        assert!(validate_args(&["--max-workers", "4"]).is_ok());
        assert!(validate_args(&["-x", "test"]).is_ok());
        assert!(validate_args(&["--exclude-task", "lint"]).is_ok());
        assert!(validate_args(&["-x", "test", "--info"]).is_ok());
    }

    #[test]
    fn test_value_taking_equals_form() {
        assert!(validate_args(&["--max-workers=4"]).is_ok());
        assert!(validate_args(&["-x=test"]).is_ok());
    }

    #[test]
    fn test_value_taking_followed_by_flag() {
        // The next token is another flag, not a value; both classify.
        assert!(validate_args(&["-x", "--info"]).is_ok());
        assert!(validate_args(&["--max-workers", "--parallel"]).is_ok());
    }

    #[test]
    fn test_value_taking_as_last_token() {
        assert!(validate_args(&["--info", "--max-workers"]).is_ok());
    }

    #[test]
    fn test_bare_value_without_flag_rejected() {
        // A bare token is only consumed as the paired value of a
        // value-taking flag; on its own it is unrecognized.
        let err = validate_args(&["build"]).unwrap_err();
        assert!(matches!(err, PolicyViolation::Unrecognized { .. }));
    }

    #[test]
    fn test_dangerous_equals_forms_rejected() {
        for arg in [
            "--init-script=evil.gradle",
            "--project-prop=key=value",
            "--settings-file=custom.gradle",
            "--build-file=other.gradle",
            "--gradle-user-home=/tmp/evil",
            "--project-dir=/etc",
            "--include-build=../other",
        ] {
            let err = validate_args(&[arg]).unwrap_err();
            assert_eq!(err.argument(), arg);
            assert!(matches!(err, PolicyViolation::Dangerous { .. }), "{arg}");
        }
    }

    #[test]
    fn test_dangerous_fused_forms_rejected() {
        for arg in ["-Pkey=value", "-Dorg.gradle.jvmargs=-Xmx4g", "-Ianything"] {
            let err = validate_args(&[arg]).unwrap_err();
            assert!(matches!(err, PolicyViolation::Dangerous { .. }), "{arg}");
        }
    }

    #[test]
    fn test_dangerous_rejected_among_safe() {
        let err = validate_args(&["--info", "-Pkey=value", "--stacktrace"]).unwrap_err();
        assert_eq!(err.argument(), "-Pkey=value");

        let err = validate_args(&["--init-script", "evil.gradle"]).unwrap_err();
        assert_eq!(err.argument(), "--init-script");
    }

    #[test]
    fn test_unknown_arguments_rejected() {
        for arg in ["--totally-unknown-flag", "--some-unknown-flag", "-z", "-Q"] {
            let err = validate_args(&[arg]).unwrap_err();
            assert!(matches!(err, PolicyViolation::Unrecognized { .. }), "{arg}");
        }
    }

    #[test]
    fn test_empty_and_whitespace_tokens_rejected() {
        assert!(validate_args(&[""]).is_err());
        assert!(validate_args(&["   "]).is_err());
    }

    #[test]
    fn test_empty_vector_accepted() {
        let empty: [&str; 0] = [];
        assert!(validate_args(&empty).is_ok());
    }

    #[test]
    fn test_validation_is_idempotent() {
        let args = ["--info", "-x", "test", "--max-workers=4"];
        assert_eq!(validate_args(&args), validate_args(&args));

        let bad = ["--info", "-Dprop=1"];
        assert_eq!(validate_args(&bad), validate_args(&bad));
    }

    #[test]
    fn test_violation_messages() {
        let err = validate_args(&["-Pkey=value"]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("'-Pkey=value'"));
        assert!(msg.contains("due to security concerns"));

        let err = validate_args(&["--bogus"]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("'--bogus'"));
        assert!(msg.contains("not in the allow-list"));
        assert!(msg.contains("--stacktrace"), "lists allowed arguments");
    }

    #[test]
    fn test_classify_arg_forms() {
        assert_eq!(
            classify_arg("--info"),
            ArgumentClass::Safe { takes_value: false }
        );
        assert_eq!(
            classify_arg("-x"),
            ArgumentClass::Safe { takes_value: true }
        );
        assert_eq!(
            classify_arg("--max-workers=8"),
            ArgumentClass::Safe { takes_value: false }
        );
        assert_eq!(classify_arg("-P"), ArgumentClass::Dangerous);
        assert_eq!(classify_arg("-Pfoo"), ArgumentClass::Dangerous);
        assert_eq!(classify_arg("--init-script=x"), ArgumentClass::Dangerous);
        assert_eq!(classify_arg("build"), ArgumentClass::Unrecognized);
        assert_eq!(classify_arg(""), ArgumentClass::Unrecognized);
    }

    #[test]
    fn test_cleaning_task_detection() {
        for task in [
            "clean",
            "cleanBuild",
            "cleanTest",
            "cleanCache",
            "Clean",
            "CLEAN",
            "appClean",
            ":app:clean",
        ] {
            assert!(is_cleaning_task(task), "'{task}' should be a cleaning task");
        }

        for task in ["build", "test", "assemble", "check", "lint", "cleanse2"] {
            assert!(!is_cleaning_task(task), "'{task}' is not a cleaning task");
        }
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn plain_safe_arg() -> impl Strategy<Value = &'static str> {
            let plain: Vec<&'static str> = SAFE_ARGS
                .iter()
                .copied()
                .filter(|a| !VALUE_TAKING_ARGS.contains(a))
                .collect();
            prop::sample::select(plain)
        }

        proptest! {
            // Any mixed-order combination of non-value-taking safe args
            // validates, regardless of length and repetition.
            #[test]
            fn safe_combinations_always_accepted(
                args in prop::collection::vec(plain_safe_arg(), 0..8)
            ) {
                prop_assert!(validate_args(&args).is_ok());
            }

            // A deny-listed token poisons the vector wherever it sits.
            #[test]
            fn dangerous_token_rejects_whole_vector(
                prefix in prop::collection::vec(plain_safe_arg(), 0..4),
                dangerous in prop::sample::select(DANGEROUS_ARGS.to_vec()),
                suffix in prop::collection::vec(plain_safe_arg(), 0..4),
            ) {
                let mut args: Vec<&str> = prefix;
                args.push(dangerous);
                args.extend(suffix);
                let err = validate_args(&args).unwrap_err();
                prop_assert!(
                    matches!(err, PolicyViolation::Dangerous { .. }),
                    "expected PolicyViolation::Dangerous, got {err:?}"
                );
            }

            // Arbitrary non-flag junk never validates.
            #[test]
            fn junk_tokens_rejected(token in "[a-zA-Z0-9_. ]{1,24}") {
                prop_assert!(validate_args(&[token.as_str()]).is_err());
            }
        }
    }
}

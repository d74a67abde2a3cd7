use std::cmp::Ordering;

use anyhow::Result;

use spackle_lib::version::compare;

use crate::output::{OutputFormat, print_json};

pub fn cmd_compare(a: &str, b: &str, output: OutputFormat) -> Result<()> {
  let result = match compare(a, b) {
    Ordering::Greater => "greater",
    Ordering::Equal => "equal",
    Ordering::Less => "less",
  };

  if output.is_json() {
    print_json(&serde_json::json!({ "a": a, "b": b, "result": result }))?;
  } else {
    println!("{}", result);
  }

  Ok(())
}

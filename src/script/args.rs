use super::value::Value;
use anyhow::{anyhow, Result};
use std::collections::BTreeMap;

/// Evaluated arguments of a single call.
#[derive(Debug, Default)]
pub struct CallArgs {
    pub positional: Vec<Value>,
    pub keyword: BTreeMap<String, Value>,
}

impl CallArgs {
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keyword.is_empty()
    }

    /// Fail unless the call was made without arguments.
    pub fn expect_none(&self, op: &str) -> Result<()> {
        if !self.is_empty() {
            return Err(anyhow!("`{op}` takes no arguments"));
        }
        Ok(())
    }

    /// Fail when more than `max` positional or any unlisted keyword
    /// argument was given.
    pub fn expect_at_most(&self, op: &str, max: usize, keywords: &[&str]) -> Result<()> {
        if self.positional.len() > max {
            return Err(anyhow!(
                "`{op}` takes at most {max} argument(s), got {}",
                self.positional.len()
            ));
        }
        if let Some(unknown) = self.keyword.keys().find(|k| !keywords.contains(&k.as_str())) {
            return Err(anyhow!("`{op}` has no argument named `{unknown}`"));
        }
        Ok(())
    }

    /// Look up an argument by position, falling back to any of its keyword
    /// names.
    pub fn get(&self, index: usize, keys: &[&str]) -> Option<&Value> {
        keys.iter()
            .find_map(|key| self.keyword.get(*key))
            .or_else(|| self.positional.get(index))
    }

    pub fn number(&self, op: &str, index: usize, keys: &[&str]) -> Result<Option<f64>> {
        match self.get(index, keys) {
            None => Ok(None),
            Some(value) => value.as_number().map(Some).ok_or_else(|| {
                anyhow!(
                    "`{op}` argument `{}` must be a number, got {} `{value}`",
                    keys[0],
                    value.type_name()
                )
            }),
        }
    }

    pub fn required_number(&self, op: &str, index: usize, keys: &[&str]) -> Result<f64> {
        self.number(op, index, keys)?
            .ok_or_else(|| anyhow!("`{op}` is missing argument `{}`", keys[0]))
    }

    pub fn required(&self, op: &str, index: usize, name: &str) -> Result<&Value> {
        self.get(index, &[name])
            .ok_or_else(|| anyhow!("`{op}` is missing argument `{name}`"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_arguments_win_over_positions() {
        let mut args = CallArgs {
            positional: vec![Value::Number(1.0), Value::Number(2.0)],
            ..CallArgs::default()
        };
        args.keyword.insert("y".into(), Value::Number(9.0));
        assert_eq!(args.number("go_to", 1, &["y"]).expect("number"), Some(9.0));
        assert_eq!(args.number("go_to", 0, &["x"]).expect("number"), Some(1.0));
        assert_eq!(args.number("go_to", 4, &["z"]).expect("number"), None);
    }

    #[test]
    fn rejects_unknown_keywords_and_extra_positions() {
        let mut args = CallArgs::default();
        args.keyword.insert("speed".into(), Value::Number(1.0));
        let err = args.expect_at_most("go_to", 5, &["x", "y"]).expect_err("unknown keyword");
        assert!(err.to_string().contains("`speed`"));

        let args = CallArgs {
            positional: vec![Value::Nil],
            ..CallArgs::default()
        };
        assert!(args.expect_none("stop").is_err());
    }

    #[test]
    fn non_numeric_argument_is_a_type_error() {
        let args = CallArgs {
            positional: vec![Value::Text("far".into())],
            ..CallArgs::default()
        };
        let err = args.required_number("go_to", 0, &["x"]).expect_err("type error");
        assert!(err.to_string().contains("must be a number"));
    }
}

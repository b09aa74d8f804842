//! Typed ffmpeg filter graph.
//!
//! The compiler builds a [`FilterGraph`] value rather than a string so the
//! structure can be inspected in tests; `Display` renders the exact text
//! passed to `-filter_complex`.

use std::fmt;

/// One filter with its options, e.g. `trim=start=1.000:duration=2.000`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    name: String,
    options: Vec<(Option<String>, String)>,
}

impl Filter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: Vec::new(),
        }
    }

    /// Append a `key=value` option.
    pub fn opt(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.options.push((Some(key.into()), value.to_string()));
        self
    }

    /// Append a positional option.
    pub fn arg(mut self, value: impl fmt::Display) -> Self {
        self.options.push((None, value.to_string()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value of a named option.
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(k, _)| k.as_deref() == Some(key))
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for (i, (key, value)) in self.options.iter().enumerate() {
            f.write_str(if i == 0 { "=" } else { ":" })?;
            if let Some(key) = key {
                write!(f, "{key}=")?;
            }
            f.write_str(value)?;
        }
        Ok(())
    }
}

/// A linear chain of filters between labelled pads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterChain {
    pub inputs: Vec<String>,
    pub filters: Vec<Filter>,
    pub outputs: Vec<String>,
}

impl FilterChain {
    pub fn new(inputs: &[&str], filters: Vec<Filter>, outputs: &[&str]) -> Self {
        Self {
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            filters,
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn from_labels(inputs: Vec<String>, filters: Vec<Filter>, outputs: Vec<String>) -> Self {
        Self {
            inputs,
            filters,
            outputs,
        }
    }
}

impl fmt::Display for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for pad in &self.inputs {
            write!(f, "[{pad}]")?;
        }
        for (i, filter) in self.filters.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{filter}")?;
        }
        for pad in &self.outputs {
            write!(f, "[{pad}]")?;
        }
        Ok(())
    }
}

/// An ordered list of chains, joined with `;`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterGraph {
    chains: Vec<FilterChain>,
}

impl FilterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chain: FilterChain) {
        self.chains.push(chain);
    }

    pub fn chains(&self) -> &[FilterChain] {
        &self.chains
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// All filters in graph order.
    pub fn filters(&self) -> impl Iterator<Item = &Filter> {
        self.chains.iter().flat_map(|c| c.filters.iter())
    }

    pub fn count_filter(&self, name: &str) -> usize {
        self.filters().filter(|f| f.name() == name).count()
    }

    pub fn contains_filter(&self, name: &str) -> bool {
        self.count_filter(name) > 0
    }
}

impl fmt::Display for FilterGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, chain) in self.chains.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            write!(f, "{chain}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_rendering() {
        assert_eq!(Filter::new("palettegen").to_string(), "palettegen");
        assert_eq!(
            Filter::new("setpts").arg("PTS-STARTPTS").to_string(),
            "setpts=PTS-STARTPTS"
        );
        assert_eq!(
            Filter::new("scale").opt("w", 480).opt("h", -1).opt("flags", "lanczos").to_string(),
            "scale=w=480:h=-1:flags=lanczos"
        );
    }

    #[test]
    fn test_chain_and_graph_rendering() {
        let mut graph = FilterGraph::new();
        graph.push(FilterChain::new(
            &["0:v"],
            vec![Filter::new("split")],
            &["a", "b"],
        ));
        graph.push(FilterChain::new(
            &["a", "b"],
            vec![Filter::new("overlay").opt("x", 0).opt("y", 0), Filter::new("null")],
            &["out"],
        ));
        assert_eq!(
            graph.to_string(),
            "[0:v]split[a][b];[a][b]overlay=x=0:y=0,null[out]"
        );
        assert!(graph.contains_filter("overlay"));
        assert_eq!(graph.count_filter("trim"), 0);
    }

    #[test]
    fn test_option_lookup() {
        let f = Filter::new("trim").opt("start", "1.500").opt("duration", "2.000");
        assert_eq!(f.option("duration"), Some("2.000"));
        assert_eq!(f.option("end"), None);
    }
}

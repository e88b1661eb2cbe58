use std::collections::BTreeSet;
use std::convert::Infallible;

use promql_parser::label::MatchOp;
use promql_parser::parser::{self, Expr, VectorSelector};
use promql_parser::util::{walk_expr, ExprVisitor};
use tracing::debug;

use crate::resources::monitoring::{PrometheusRule, ScrapeConfig};
use crate::{Error, Result};

const METRIC_NAME_LABEL: &str = "__name__";
const MATCH_PARAM: &str = "match[]";

// Collects the metric names selected by equality, skipping recording rule outputs
#[derive(Default)]
struct MetricNames {
    names: BTreeSet<String>,
}

impl MetricNames {
    fn insert(&mut self, name: &str) {
        // recording rules are named level:metric:operations
        if !name.contains(':') {
            self.names.insert(name.to_string());
        }
    }

    fn visit_selector(&mut self, vs: &VectorSelector) {
        if let Some(name) = &vs.name {
            self.insert(name);
        }
        for matcher in vs
            .matchers
            .matchers
            .iter()
            .filter(|m| m.name == METRIC_NAME_LABEL)
        {
            match matcher.op {
                MatchOp::Equal => self.insert(&matcher.value),
                _ => debug!(
                    "Ignoring non-equality matcher on {}: {:?}",
                    METRIC_NAME_LABEL, matcher
                ),
            }
        }
    }
}

impl ExprVisitor for MetricNames {
    type Error = Infallible;

    fn pre_visit(&mut self, plan: &Expr) -> Result<bool, Self::Error> {
        match plan {
            Expr::VectorSelector(vs) => self.visit_selector(vs),
            Expr::MatrixSelector(ms) => self.visit_selector(&ms.vs),
            _ => {}
        }
        Ok(true)
    }
}

fn collect(names: &mut MetricNames, query: &str) -> Result<()> {
    let expr = parser::parse(query).map_err(|message| Error::PromQLParse {
        query: query.to_string(),
        message,
    })?;
    walk_expr(names, &expr).unwrap_or_else(|never| match never {});
    Ok(())
}

/// The raw metric names a PromQL expression depends on, sorted
pub fn dependent_metrics(query: &str) -> Result<Vec<String>> {
    let mut names = MetricNames::default();
    collect(&mut names, query)?;
    Ok(names.names.into_iter().collect())
}

/// The raw metric names the federation queries of `scrape_configs` and the expressions of `rules`
/// depend on, deduplicated and sorted
pub fn collection_dependent_metrics(
    scrape_configs: &[ScrapeConfig],
    rules: &[PrometheusRule],
) -> Result<Vec<String>> {
    let mut names = MetricNames::default();

    let queries = scrape_configs
        .iter()
        .filter_map(|sc| sc.spec.params.as_ref())
        .filter_map(|params| params.get(MATCH_PARAM))
        .flatten();
    for query in queries {
        collect(&mut names, query)?;
    }

    let exprs = rules
        .iter()
        .filter_map(|rule| rule.spec.groups.as_ref())
        .flatten()
        .flat_map(|group| group.rules.iter())
        .map(|rule| rule.expr_string());
    for expr in exprs {
        collect(&mut names, &expr)?;
    }

    Ok(names.names.into_iter().collect())
}

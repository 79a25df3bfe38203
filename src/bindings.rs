//! Reactive binding layer: which control invalidates which figure, and the
//! per-session control state the figures are recomputed from.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::time::Instant;

use chrono::NaiveDate;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::chart_spec::ChartSpec;
use crate::error::{DashboardError, Result};
use crate::figures::{self, Figure};
use crate::filters::{
    CategoryFilter, DateRange, Dimension, DiscountImpactFilter, DiscountRange, FilterSpec,
    GeographyFilter, Measure, Metric, ProductView, SalesOverTimeFilter, SeasonalityFilter,
    SeasonalityView, TopProductsFilter,
};
use crate::store::{ControlDomains, DatasetStore};

/// Wire format of date controls.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ── Controls ────────────────────────────────────────────────────────────────

pub mod control {
    pub const START_DATE: &str = "sales_over_time.start_date";
    pub const END_DATE: &str = "sales_over_time.end_date";
    pub const WINDOW: &str = "sales_over_time.window";
    pub const TIME_MEASURE: &str = "sales_over_time.measure";
    pub const DIMENSION: &str = "geography.dimension";
    pub const METRIC: &str = "geography.metric";
    pub const PRODUCT_VIEW: &str = "top_products.view";
    pub const PRODUCT_MEASURE: &str = "top_products.measure";
    pub const PRODUCT_CATEGORIES: &str = "top_products.categories";
    pub const SEASONALITY_VIEW: &str = "seasonality.view";
    pub const SEASONALITY_CATEGORY: &str = "seasonality.category";
    pub const DISCOUNT_RANGE: &str = "discount_impact.range";
    pub const DISCOUNT_CATEGORY: &str = "discount_impact.category";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlKind {
    Date,
    Number,
    Text,
    TextList,
    NumberPair,
}

impl fmt::Display for ControlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ControlKind::Date => "a date string or null",
            ControlKind::Number => "a number",
            ControlKind::Text => "a string",
            ControlKind::TextList => "a list of strings",
            ControlKind::NumberPair => "a pair of numbers",
        })
    }
}

/// Every control, the figure it drives and the shape of its value.
pub const CONTROLS: [(&str, Figure, ControlKind); 13] = [
    (control::START_DATE, Figure::SalesOverTime, ControlKind::Date),
    (control::END_DATE, Figure::SalesOverTime, ControlKind::Date),
    (control::WINDOW, Figure::SalesOverTime, ControlKind::Number),
    (control::TIME_MEASURE, Figure::SalesOverTime, ControlKind::Text),
    (control::DIMENSION, Figure::Geography, ControlKind::Text),
    (control::METRIC, Figure::Geography, ControlKind::Text),
    (control::PRODUCT_VIEW, Figure::TopProducts, ControlKind::Text),
    (control::PRODUCT_MEASURE, Figure::TopProducts, ControlKind::Text),
    (control::PRODUCT_CATEGORIES, Figure::TopProducts, ControlKind::TextList),
    (control::SEASONALITY_VIEW, Figure::Seasonality, ControlKind::Text),
    (control::SEASONALITY_CATEGORY, Figure::Seasonality, ControlKind::Text),
    (control::DISCOUNT_RANGE, Figure::DiscountImpact, ControlKind::NumberPair),
    (control::DISCOUNT_CATEGORY, Figure::DiscountImpact, ControlKind::Text),
];

/// A control value as it travels between page and server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ControlValue {
    Null,
    NumberPair([f64; 2]),
    Number(f64),
    TextList(Vec<String>),
    Text(String),
}

impl ControlValue {
    fn text(s: impl Into<String>) -> Self {
        ControlValue::Text(s.into())
    }

    fn date(d: Option<NaiveDate>) -> Self {
        d.map_or(ControlValue::Null, |d| {
            ControlValue::Text(d.format(DATE_FORMAT).to_string())
        })
    }
}

// ── Binding table ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BindingNode {
    Control(&'static str, ControlKind),
    Figure(Figure),
}

/// Directed graph with an edge from each control to every figure it
/// invalidates.
pub struct BindingTable {
    graph: DiGraph<BindingNode, ()>,
    controls: HashMap<&'static str, NodeIndex>,
    figures: HashMap<Figure, NodeIndex>,
}

impl Default for BindingTable {
    fn default() -> Self {
        Self::new()
    }
}

impl BindingTable {
    pub fn new() -> Self {
        let mut graph = DiGraph::new();
        let figures: HashMap<Figure, NodeIndex> = Figure::ALL
            .into_iter()
            .map(|f| (f, graph.add_node(BindingNode::Figure(f))))
            .collect();

        let mut controls = HashMap::new();
        for (id, figure, kind) in CONTROLS {
            let node = graph.add_node(BindingNode::Control(id, kind));
            graph.add_edge(node, figures[&figure], ());
            controls.insert(id, node);
        }

        Self {
            graph,
            controls,
            figures,
        }
    }

    fn node(&self, control: &str) -> Result<NodeIndex> {
        self.controls
            .get(control)
            .copied()
            .ok_or_else(|| DashboardError::UnknownControl(control.to_string()))
    }

    /// Figures that must be recomputed when `control` changes.
    pub fn affected(&self, control: &str) -> Result<Vec<Figure>> {
        let node = self.node(control)?;
        let mut out: Vec<Figure> = self
            .graph
            .neighbors_directed(node, Direction::Outgoing)
            .filter_map(|n| match self.graph[n] {
                BindingNode::Figure(f) => Some(f),
                BindingNode::Control(..) => None,
            })
            .collect();
        out.sort();
        Ok(out)
    }

    /// Controls feeding `figure`, in declaration order.
    pub fn controls_of(&self, figure: Figure) -> Vec<&'static str> {
        let Some(&node) = self.figures.get(&figure) else {
            return Vec::new();
        };
        let mut ids: Vec<(NodeIndex, &'static str)> = self
            .graph
            .neighbors_directed(node, Direction::Incoming)
            .filter_map(|n| match self.graph[n] {
                BindingNode::Control(id, _) => Some((n, id)),
                BindingNode::Figure(_) => None,
            })
            .collect();
        ids.sort_by_key(|(n, _)| *n);
        ids.into_iter().map(|(_, id)| id).collect()
    }

    pub fn kind(&self, control: &str) -> Result<ControlKind> {
        match self.graph[self.node(control)?] {
            BindingNode::Control(_, kind) => Ok(kind),
            BindingNode::Figure(f) => Err(DashboardError::UnknownControl(f.to_string())),
        }
    }
}

// ── Control descriptors ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlOption {
    pub label: String,
    pub value: String,
}

impl ControlOption {
    fn new(label: &str, value: &str) -> Self {
        Self {
            label: label.to_string(),
            value: value.to_string(),
        }
    }

    fn same(value: &str) -> Self {
        Self::new(value, value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SliderMark {
    pub value: f64,
    pub label: String,
}

/// Everything the page needs to draw one input widget.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlDescriptor {
    pub id: &'static str,
    pub figure: Figure,
    pub kind: ControlKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ControlOption>,
    pub default: ControlValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<SliderMark>,
}

const DISCOUNT_STEP: f64 = 0.05;
const MOVING_AVERAGE_WINDOWS: [u32; 3] = [7, 14, 30];

/// Marks at 0.0, 0.2, …, 1.0 that fall inside `[low, high]`.
pub fn discount_marks(low: f64, high: f64) -> Vec<SliderMark> {
    (0..=5)
        .map(|i| f64::from(i) / 5.0)
        .filter(|m| low <= *m && *m <= high)
        .map(|value| SliderMark {
            value,
            label: format!("{value:.1}"),
        })
        .collect()
}

/// Descriptors for all controls, with defaults taken from a fresh session.
pub fn descriptors(domains: &ControlDomains) -> Vec<ControlDescriptor> {
    let defaults = Session::new(domains).values();
    let categories: Vec<ControlOption> = domains
        .categories
        .iter()
        .map(|c| ControlOption::same(c))
        .collect();
    let measures = |list: &[Measure]| -> Vec<ControlOption> {
        list.iter()
            .map(|m| ControlOption::same(m.column()))
            .collect()
    };

    CONTROLS
        .into_iter()
        .map(|(id, figure, kind)| {
            let mut d = ControlDescriptor {
                id,
                figure,
                kind,
                options: Vec::new(),
                default: defaults.get(id).cloned().unwrap_or(ControlValue::Null),
                min: None,
                max: None,
                step: None,
                marks: Vec::new(),
            };
            match id {
                control::START_DATE | control::END_DATE => {
                    d.options = [domains.first_date, domains.last_date]
                        .into_iter()
                        .flatten()
                        .map(|date| ControlOption::same(&date.format(DATE_FORMAT).to_string()))
                        .collect();
                }
                control::WINDOW => {
                    d.min = Some(7.0);
                    d.max = Some(30.0);
                    d.step = Some(7.0);
                    d.marks = MOVING_AVERAGE_WINDOWS
                        .iter()
                        .map(|&w| SliderMark {
                            value: f64::from(w),
                            label: format!("{w}D"),
                        })
                        .collect();
                }
                control::TIME_MEASURE => d.options = measures(&[Measure::Sales, Measure::Profit]),
                control::DIMENSION => {
                    d.options = [Dimension::Region, Dimension::Market, Dimension::Country]
                        .iter()
                        .map(|dim| ControlOption::same(dim.column()))
                        .collect();
                }
                control::METRIC => {
                    d.options = vec![
                        ControlOption::new("Sales", Metric::TotalSales.column()),
                        ControlOption::new("Profit", Metric::Profit.column()),
                    ];
                }
                control::PRODUCT_VIEW => {
                    d.options = vec![
                        ControlOption::new("Horizontal Bar Chart", "bar"),
                        ControlOption::new("Treemap", "treemap"),
                    ];
                }
                control::PRODUCT_MEASURE => {
                    d.options = measures(&[Measure::Sales, Measure::Profit, Measure::Quantity]);
                }
                control::PRODUCT_CATEGORIES | control::SEASONALITY_CATEGORY => {
                    d.options = categories.clone();
                }
                control::SEASONALITY_VIEW => {
                    d.options = vec![
                        ControlOption::new("Day of Week vs. Month", "heatmap"),
                        ControlOption::new("Monthly Trends", "line"),
                    ];
                }
                control::DISCOUNT_RANGE => {
                    if let Some((low, high)) = domains.discount {
                        d.min = Some(low);
                        d.max = Some(high);
                        d.marks = discount_marks(low, high);
                    }
                    d.step = Some(DISCOUNT_STEP);
                }
                control::DISCOUNT_CATEGORY => {
                    d.options = std::iter::once(ControlOption::same(CategoryFilter::ALL))
                        .chain(categories.iter().cloned())
                        .collect();
                }
                _ => {}
            }
            d
        })
        .collect()
}

// ── Session ─────────────────────────────────────────────────────────────────

/// One viewer's control state. Filters are rebuilt from it on each render.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    sales_over_time: SalesOverTimeFilter,
    geography: GeographyFilter,
    top_products: TopProductsFilter,
    seasonality: SeasonalityFilter,
    discount_impact: DiscountImpactFilter,
    last_used: Instant,
}

impl Session {
    /// Session with every control at its default for the given domains.
    pub fn new(domains: &ControlDomains) -> Self {
        let (low, high) = domains.discount.unwrap_or((0.0, 1.0));
        Self {
            id: Uuid::new_v4(),
            sales_over_time: SalesOverTimeFilter {
                dates: DateRange {
                    start: domains.first_date,
                    end: domains.last_date,
                },
                window: 7,
                measure: Measure::Sales,
            },
            geography: GeographyFilter {
                dimension: Dimension::Country,
                metric: Metric::TotalSales,
            },
            top_products: TopProductsFilter {
                view: ProductView::Bar,
                measure: Measure::Sales,
                categories: domains.categories.iter().cloned().collect(),
            },
            seasonality: SeasonalityFilter {
                view: SeasonalityView::Heatmap,
                category: domains.categories.first().cloned().unwrap_or_default(),
            },
            discount_impact: DiscountImpactFilter {
                discount: DiscountRange { low, high },
                category: CategoryFilter::All,
            },
            last_used: Instant::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn last_used(&self) -> Instant {
        self.last_used
    }

    pub fn touch(&mut self) {
        self.last_used = Instant::now();
    }

    /// Store a new control value and recompute the figures it invalidates.
    ///
    /// The session is left untouched when the control id or value is
    /// rejected.
    pub fn apply(
        &mut self,
        store: &DatasetStore,
        bindings: &BindingTable,
        control: &str,
        value: ControlValue,
    ) -> Result<Vec<(Figure, ChartSpec)>> {
        let affected = bindings.affected(control)?;
        let kind = bindings.kind(control)?;
        self.set(control, kind, value)?;
        self.touch();
        debug!(session = %self.id, control, figures = affected.len(), "control changed");

        affected
            .into_iter()
            .map(|figure| Ok((figure, figures::render(store, &self.filter_for(figure))?)))
            .collect()
    }

    fn set(&mut self, control: &str, kind: ControlKind, value: ControlValue) -> Result<()> {
        let invalid = |reason: String| DashboardError::InvalidControlValue {
            control: control.to_string(),
            reason,
        };
        let wrong_type = || invalid(format!("expected {kind}"));

        match (kind, value) {
            (ControlKind::Date, value) => {
                let date = match value {
                    ControlValue::Null => None,
                    ControlValue::Text(s) => Some(parse_date(&s).map_err(invalid)?),
                    _ => return Err(wrong_type()),
                };
                if control == control::START_DATE {
                    self.sales_over_time.dates.start = date;
                } else {
                    self.sales_over_time.dates.end = date;
                }
            }
            (ControlKind::Number, ControlValue::Number(n)) => {
                if !n.is_finite() || n < 0.0 || n.fract() != 0.0 {
                    return Err(invalid(format!("{n} is not a whole number of days")));
                }
                self.sales_over_time.window = n as usize;
            }
            (ControlKind::NumberPair, ControlValue::NumberPair([low, high])) => {
                if !low.is_finite() || !high.is_finite() {
                    return Err(invalid("bounds must be finite".to_string()));
                }
                self.discount_impact.discount = DiscountRange { low, high };
            }
            (ControlKind::TextList, ControlValue::TextList(list)) => {
                self.top_products.categories = list.into_iter().collect::<BTreeSet<_>>();
            }
            (ControlKind::Text, ControlValue::Text(s)) => match control {
                control::TIME_MEASURE => {
                    self.sales_over_time.measure = parse_choice(&s).map_err(invalid)?
                }
                control::DIMENSION => self.geography.dimension = parse_choice(&s).map_err(invalid)?,
                control::METRIC => self.geography.metric = parse_choice(&s).map_err(invalid)?,
                control::PRODUCT_VIEW => {
                    self.top_products.view = parse_choice(&s).map_err(invalid)?
                }
                control::PRODUCT_MEASURE => {
                    self.top_products.measure = parse_choice(&s).map_err(invalid)?
                }
                control::SEASONALITY_VIEW => {
                    self.seasonality.view = parse_choice(&s).map_err(invalid)?
                }
                control::SEASONALITY_CATEGORY => self.seasonality.category = s,
                control::DISCOUNT_CATEGORY => self.discount_impact.category = s.into(),
                other => return Err(DashboardError::UnknownControl(other.to_string())),
            },
            _ => return Err(wrong_type()),
        }
        Ok(())
    }

    /// Filter for `figure`, built from the current control values.
    pub fn filter_for(&self, figure: Figure) -> FilterSpec {
        match figure {
            Figure::SalesOverTime => FilterSpec::SalesOverTime(self.sales_over_time.clone()),
            Figure::Geography => FilterSpec::Geography(self.geography.clone()),
            Figure::TopProducts => FilterSpec::TopProducts(self.top_products.clone()),
            Figure::Seasonality => FilterSpec::Seasonality(self.seasonality.clone()),
            Figure::DiscountImpact => FilterSpec::DiscountImpact(self.discount_impact.clone()),
        }
    }

    pub fn render_all(&self, store: &DatasetStore) -> Result<Vec<(Figure, ChartSpec)>> {
        Figure::ALL
            .into_iter()
            .map(|figure| Ok((figure, figures::render(store, &self.filter_for(figure))?)))
            .collect()
    }

    /// Current value of every control, keyed by control id.
    pub fn values(&self) -> BTreeMap<&'static str, ControlValue> {
        let sot = &self.sales_over_time;
        let tp = &self.top_products;
        BTreeMap::from([
            (control::START_DATE, ControlValue::date(sot.dates.start)),
            (control::END_DATE, ControlValue::date(sot.dates.end)),
            (control::WINDOW, ControlValue::Number(sot.window as f64)),
            (control::TIME_MEASURE, ControlValue::text(sot.measure.column())),
            (control::DIMENSION, ControlValue::text(self.geography.dimension.column())),
            (control::METRIC, ControlValue::text(self.geography.metric.column())),
            (control::PRODUCT_VIEW, ControlValue::text(choice_name(&tp.view))),
            (control::PRODUCT_MEASURE, ControlValue::text(tp.measure.column())),
            (
                control::PRODUCT_CATEGORIES,
                ControlValue::TextList(tp.categories.iter().cloned().collect()),
            ),
            (
                control::SEASONALITY_VIEW,
                ControlValue::text(choice_name(&self.seasonality.view)),
            ),
            (
                control::SEASONALITY_CATEGORY,
                ControlValue::text(self.seasonality.category.clone()),
            ),
            (
                control::DISCOUNT_RANGE,
                ControlValue::NumberPair(self.discount_impact.discount.into()),
            ),
            (
                control::DISCOUNT_CATEGORY,
                ControlValue::text(String::from(self.discount_impact.category.clone())),
            ),
        ])
    }
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time part.
fn parse_date(s: &str) -> std::result::Result<NaiveDate, String> {
    let day = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(day, DATE_FORMAT).map_err(|e| format!("'{s}': {e}"))
}

/// Parse one of a closed set of choices through its serde name.
fn parse_choice<T: DeserializeOwned>(s: &str) -> std::result::Result<T, String> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|_| format!("'{s}' is not a valid option"))
}

fn choice_name<T: Serialize>(v: &T) -> String {
    match serde_json::to_value(v) {
        Ok(serde_json::Value::String(s)) => s,
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domains() -> ControlDomains {
        ControlDomains {
            first_date: NaiveDate::from_ymd_opt(2023, 1, 1),
            last_date: NaiveDate::from_ymd_opt(2023, 3, 31),
            categories: vec!["Furniture".into(), "Technology".into()],
            discount: Some((0.0, 0.5)),
            profit: Some((-10.0, 40.0)),
        }
    }

    #[test]
    fn each_control_drives_only_its_own_figure() {
        let table = BindingTable::new();
        for (id, figure, _) in CONTROLS {
            assert_eq!(table.affected(id).unwrap(), vec![figure], "{id}");
        }
        assert_eq!(table.controls_of(Figure::Geography), vec![control::DIMENSION, control::METRIC]);
        assert_eq!(table.controls_of(Figure::SalesOverTime).len(), 4);
    }

    #[test]
    fn unknown_control_is_rejected() {
        let table = BindingTable::new();
        assert!(matches!(
            table.affected("fig9.colour"),
            Err(DashboardError::UnknownControl(_))
        ));
    }

    #[test]
    fn defaults_come_from_domains() {
        let s = Session::new(&domains());
        let FilterSpec::SalesOverTime(f) = s.filter_for(Figure::SalesOverTime) else {
            panic!("wrong filter");
        };
        assert_eq!(f.dates.start, NaiveDate::from_ymd_opt(2023, 1, 1));
        assert_eq!(f.window, 7);

        let FilterSpec::Seasonality(f) = s.filter_for(Figure::Seasonality) else {
            panic!("wrong filter");
        };
        assert_eq!(f.category, "Furniture");

        let values = s.values();
        assert_eq!(values[control::START_DATE], ControlValue::Text("2023-01-01".into()));
        assert_eq!(values[control::DISCOUNT_RANGE], ControlValue::NumberPair([0.0, 0.5]));
        assert_eq!(values[control::PRODUCT_VIEW], ControlValue::Text("bar".into()));
    }

    #[test]
    fn set_validates_type_and_domain() {
        let mut s = Session::new(&domains());
        let set = |s: &mut Session, id: &str, v: ControlValue| {
            let kind = BindingTable::new().kind(id).unwrap();
            s.set(id, kind, v)
        };

        assert!(set(&mut s, control::METRIC, ControlValue::Text("Profit".into())).is_ok());
        assert!(matches!(
            set(&mut s, control::METRIC, ControlValue::Text("Revenue".into())),
            Err(DashboardError::InvalidControlValue { .. })
        ));
        assert!(matches!(
            set(&mut s, control::WINDOW, ControlValue::Text("7".into())),
            Err(DashboardError::InvalidControlValue { .. })
        ));
        assert!(set(&mut s, control::WINDOW, ControlValue::Number(2.5)).is_err());
        assert!(set(&mut s, control::START_DATE, ControlValue::Text("not a date".into())).is_err());

        // Degenerate but well-typed values are accepted.
        assert!(set(&mut s, control::DISCOUNT_RANGE, ControlValue::NumberPair([0.4, 0.1])).is_ok());
        assert!(set(&mut s, control::SEASONALITY_CATEGORY, ControlValue::Text("Toys".into())).is_ok());
        assert_eq!(s.values()[control::METRIC], ControlValue::Text("Profit".into()));
    }

    #[test]
    fn control_values_decode_by_shape() {
        let v: ControlValue = serde_json::from_str("[0.1, 0.3]").unwrap();
        assert_eq!(v, ControlValue::NumberPair([0.1, 0.3]));
        let v: ControlValue = serde_json::from_str(r#"["Furniture"]"#).unwrap();
        assert_eq!(v, ControlValue::TextList(vec!["Furniture".into()]));
        let v: ControlValue = serde_json::from_str("14").unwrap();
        assert_eq!(v, ControlValue::Number(14.0));
        let v: ControlValue = serde_json::from_str("null").unwrap();
        assert_eq!(v, ControlValue::Null);
    }

    #[test]
    fn discount_marks_stay_within_bounds() {
        let marks: Vec<f64> = discount_marks(0.0, 0.5).iter().map(|m| m.value).collect();
        assert_eq!(marks.len(), 3);
        assert_eq!(discount_marks(0.0, 0.5)[2].label, "0.4");
        assert!(discount_marks(0.05, 0.15).is_empty());
    }

    #[test]
    fn descriptors_cover_every_control() {
        let d = descriptors(&domains());
        assert_eq!(d.len(), CONTROLS.len());
        let cat = d.iter().find(|d| d.id == control::DISCOUNT_CATEGORY).unwrap();
        assert_eq!(cat.options[0].value, "All");
        assert_eq!(cat.options.len(), 3);
        let window = d.iter().find(|d| d.id == control::WINDOW).unwrap();
        assert_eq!(window.marks.len(), 3);
    }
}

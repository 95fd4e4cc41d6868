use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, error};

use super::numeric::parse_numeric_value;

/// Elements whose text is considered when scanning for a market cap.
const TEXT_ELEMENTS: &str = "div, span, p";
const MARKET_CAP_LABELS: [&str; 2] = ["market cap", "market cap:"];
const MARKET_CAP_NEEDLE: &str = "market cap";
/// How far up the tree a currency-looking value may sit below its label.
const MAX_ANCESTOR_LEVELS: usize = 3;

/// Source of a best-effort market-cap reading for a rendered page.
///
/// Implementations never fail: zero means "not available yet" and callers
/// must never treat it as a real valuation.
pub trait MarketCapExtractor: Send + Sync {
    fn extract_market_cap(&self, document: &Html) -> Decimal;
}

/// Layered text heuristics over page markup we do not control.
///
/// 1. An element whose whole text is `market cap` (or `market cap:`) labels
///    the value held by its next sibling element, or else by the last element
///    child of its parent.
/// 2. Failing that, any element showing a `$` and a digit is accepted when
///    one of its nearest ancestors mentions `market cap`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicExtractor;

impl HeuristicExtractor {
    pub fn new() -> Self {
        Self
    }

    fn from_label(elements: &[ElementRef<'_>]) -> Option<Decimal> {
        for element in elements {
            let text = text_of(*element).trim().to_lowercase();
            if !MARKET_CAP_LABELS.contains(&text.as_str()) {
                continue;
            }

            let value_element = next_sibling_element(*element).or_else(|| {
                parent_element(*element).and_then(last_child_element)
            });

            if let Some(value_element) = value_element {
                if value_element == *element {
                    continue;
                }
                let mcap = parse_numeric_value(&text_of(value_element));
                if mcap > Decimal::ZERO {
                    debug!("Market cap {} found next to label", mcap);
                    return Some(mcap);
                }
            }
        }
        None
    }

    fn from_currency_near_label(elements: &[ElementRef<'_>]) -> Option<Decimal> {
        for element in elements {
            let text = text_of(*element);
            if !text.contains('$') || !text.chars().any(|c| c.is_ascii_digit()) {
                continue;
            }

            let mut ancestor = parent_element(*element);
            for _ in 0..MAX_ANCESTOR_LEVELS {
                let Some(parent) = ancestor else {
                    break;
                };
                if text_of(parent).to_lowercase().contains(MARKET_CAP_NEEDLE) {
                    let mcap = parse_numeric_value(&text);
                    if mcap > Decimal::ZERO {
                        debug!("Market cap {} found under a labelled ancestor", mcap);
                        return Some(mcap);
                    }
                }
                ancestor = parent_element(parent);
            }
        }
        None
    }
}

impl MarketCapExtractor for HeuristicExtractor {
    fn extract_market_cap(&self, document: &Html) -> Decimal {
        let selector = match Selector::parse(TEXT_ELEMENTS) {
            Ok(selector) => selector,
            Err(e) => {
                error!("Market cap parse error: {:?}", e);
                return Decimal::ZERO;
            }
        };

        let elements: Vec<ElementRef<'_>> = document.select(&selector).collect();

        Self::from_label(&elements)
            .or_else(|| Self::from_currency_near_label(&elements))
            .unwrap_or_else(|| {
                debug!("No market cap on page ({} text elements scanned)", elements.len());
                Decimal::ZERO
            })
    }
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect()
}

fn next_sibling_element(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element.next_siblings().find_map(ElementRef::wrap)
}

fn parent_element(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element.parent().and_then(ElementRef::wrap)
}

fn last_child_element(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element.children().rev().find_map(ElementRef::wrap)
}

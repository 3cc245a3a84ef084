//! Text codec for bin weights.
//!
//! The format is a bare list of decimal numbers: no header, no metadata.
//! Values are joined by a separator (default `;`), may use a locale decimal
//! separator (`,`) and may carry a `%` suffix, in which case the number is
//! divided by 100 on input.
//!
//! # Examples
//!
//! ```
//! use u_distfit::binned::{BinnedDistribution, Locale};
//!
//! let dist = BinnedDistribution::from_values(10.0, &[3.0, 4.0, 2.0, 0.0, 1.5]);
//! assert_eq!(dist.to_text_default(), "3;4;2;0;1.5");
//! assert_eq!(dist.to_text("#", Locale::GERMAN), "3#4#2#0#1,5");
//! assert_eq!(dist.to_percent_text(Locale::INVARIANT), "300%;400%;200%;0%;150%");
//!
//! let parsed = BinnedDistribution::from_text(Some("3;4;2;0;150%"), 10.0).unwrap();
//! assert_eq!(parsed, dist);
//! ```

use std::fmt;

use tracing::warn;

use super::BinnedDistribution;
use crate::error::{DistributionError, Result};

/// Default separator between values.
pub const DEFAULT_SEPARATOR: &str = ";";

/// Largest sample accepted by the sample histograms. A sample `k` occupies
/// bin `k`, so the histogram holds `k + 1` bins.
pub const MAX_SAMPLE_VALUE: u32 = 10_000_000;

/// Separators recognized by the auto-detecting parsers.
const ANY_SEPARATORS: [char; 3] = [';', '\t', '\n'];

/// Decimals kept by percent output.
const PERCENT_DECIMALS: usize = 3;

/// Decimal formatting convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Locale {
    /// Character between integer and fractional digits.
    pub decimal_separator: char,
}

impl Locale {
    /// Locale-independent formatting (`.`), used for storage.
    pub const INVARIANT: Locale = Locale {
        decimal_separator: '.',
    };

    /// Decimal comma, as in German or French.
    pub const GERMAN: Locale = Locale {
        decimal_separator: ',',
    };

    /// Formats `value` with the shortest representation that reads back to
    /// the same `f64`.
    pub fn format_number(&self, value: f64) -> String {
        self.localize(format!("{value}"))
    }

    /// Formats `value·100` with at most three decimals and a `%` suffix.
    pub fn format_percent(&self, value: f64) -> String {
        let mut s = self.localize(format_decimals(value * 100.0, PERCENT_DECIMALS));
        s.push('%');
        s
    }

    fn localize(&self, s: String) -> String {
        if self.decimal_separator == '.' {
            s
        } else {
            s.replace('.', &self.decimal_separator.to_string())
        }
    }
}

impl Default for Locale {
    fn default() -> Self {
        Locale::INVARIANT
    }
}

/// Formats `value` with at most `decimals` fractional digits, dropping
/// trailing zeros (invariant locale).
pub(crate) fn format_decimals(value: f64, decimals: usize) -> String {
    let mut s = format!("{value:.decimals$}");
    if s.contains('.') {
        let trimmed = s.trim_end_matches('0').trim_end_matches('.').len();
        s.truncate(trimmed);
    }
    if s == "-0" {
        s = "0".to_string();
    }
    s
}

/// Parses one weight: plain number, decimal-comma number or percentage.
///
/// Returns `None` if the token is none of these.
pub fn parse_number(token: &str) -> Option<f64> {
    let token = token.trim();
    if let Some(percent) = token.strip_suffix('%') {
        return parse_plain(percent.trim()).map(|v| v / 100.0);
    }
    parse_plain(token)
}

fn parse_plain(token: &str) -> Option<f64> {
    if token.is_empty() {
        return None;
    }
    token
        .parse::<f64>()
        .ok()
        .or_else(|| token.replace(',', ".").parse::<f64>().ok())
}

/// Splits on any of `separators`, dropping trailing empty tokens.
fn split_tokens<'a>(text: &'a str, separators: &[char]) -> Vec<&'a str> {
    let mut tokens: Vec<&str> = text.split(|c| separators.contains(&c)).collect();
    while tokens.last().is_some_and(|t| t.trim().is_empty()) {
        tokens.pop();
    }
    tokens
}

impl BinnedDistribution {
    /// Parses a `;`-separated list of weights.
    ///
    /// `None` or an empty string yields a zero-length distribution.
    ///
    /// # Errors
    ///
    /// [`DistributionError::InvalidNumber`] for a token that is neither a
    /// number (with `.` or `,` decimals) nor a percentage.
    pub fn from_text(text: Option<&str>, upper_bound: f64) -> Result<Self> {
        Self::parse_with(text, upper_bound, &[';'])
    }

    /// Like [`from_text`](Self::from_text), but any of `;`, tab or newline
    /// separates values (mixed separators are allowed).
    ///
    /// # Examples
    ///
    /// ```
    /// use u_distfit::binned::BinnedDistribution;
    ///
    /// let dist = BinnedDistribution::from_any_text(Some("3\t4\n2;0;150%"), 10.0).unwrap();
    /// assert_eq!(dist.bins(), &[3.0, 4.0, 2.0, 0.0, 1.5]);
    /// ```
    pub fn from_any_text(text: Option<&str>, upper_bound: f64) -> Result<Self> {
        Self::parse_with(text, upper_bound, &ANY_SEPARATORS)
    }

    /// Parses already split tokens.
    ///
    /// # Errors
    ///
    /// [`DistributionError::InvalidNumber`] for an unparsable token.
    pub fn from_tokens<S: AsRef<str>>(tokens: &[S], upper_bound: f64) -> Result<Self> {
        let values = tokens
            .iter()
            .enumerate()
            .map(|(index, token)| {
                let token = token.as_ref();
                parse_number(token).ok_or_else(|| {
                    warn!(index, token, "unparsable density value");
                    DistributionError::InvalidNumber {
                        index,
                        token: token.to_string(),
                    }
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        Ok(Self::from_vec(upper_bound, values))
    }

    fn parse_with(text: Option<&str>, upper_bound: f64, separators: &[char]) -> Result<Self> {
        match text {
            Some(text) if !text.is_empty() => {
                Self::from_tokens(&split_tokens(text, separators), upper_bound)
            }
            _ => Ok(Self::new(upper_bound, 0)),
        }
    }

    // -----------------------------------------------------------------------
    // Sample histograms
    // -----------------------------------------------------------------------

    /// Histogram of integer samples: `bins[k]` counts the samples equal to
    /// `k`, `N = max + 1` and `upper_bound = N`, so bin `k` covers `[k, k+1)`.
    ///
    /// With `normalize` every bin is divided by the sample count. No samples
    /// give an empty distribution over `[0, 1]`.
    ///
    /// # Errors
    ///
    /// [`DistributionError::SampleTooLarge`] for a sample above
    /// [`MAX_SAMPLE_VALUE`].
    ///
    /// # Examples
    ///
    /// ```
    /// use u_distfit::binned::BinnedDistribution;
    ///
    /// let dist = BinnedDistribution::from_samples(&[0, 0, 1, 3], false).unwrap();
    /// assert_eq!(dist.bins(), &[2.0, 1.0, 0.0, 1.0]);
    /// assert_eq!(dist.upper_bound(), 4.0);
    /// assert!(BinnedDistribution::from_samples(&[u32::MAX], false).is_err());
    /// ```
    pub fn from_samples(samples: &[u32], normalize: bool) -> Result<Self> {
        Self::from_sample_sets(&[samples], normalize)
    }

    /// Histogram over several sample collections merged together.
    ///
    /// # Errors
    ///
    /// [`DistributionError::SampleTooLarge`] for a sample above
    /// [`MAX_SAMPLE_VALUE`].
    pub fn from_sample_sets(sets: &[&[u32]], normalize: bool) -> Result<Self> {
        let count: usize = sets.iter().map(|s| s.len()).sum();
        let Some(max) = sets.iter().flat_map(|s| s.iter()).copied().max() else {
            return Ok(Self::new(1.0, 0));
        };

        let n = sample_bins(max)?;
        let mut bins = vec![0.0; n];
        for &sample in sets.iter().flat_map(|s| s.iter()) {
            bins[sample as usize] += 1.0;
        }
        if normalize {
            let count = count as f64;
            bins.iter_mut().for_each(|b| *b /= count);
        }
        Ok(Self::from_vec(n as f64, bins))
    }

    /// Normalized histogram from parallel rows of values and their counts.
    ///
    /// Pairs beyond the shorter row are ignored.
    ///
    /// # Errors
    ///
    /// [`DistributionError::SampleTooLarge`] for a value above
    /// [`MAX_SAMPLE_VALUE`].
    pub fn from_value_counts(values: &[u32], counts: &[f64]) -> Result<Self> {
        let pairs = values.len().min(counts.len());
        let Some(max) = values[..pairs].iter().copied().max() else {
            return Ok(Self::new(1.0, 0));
        };
        let n = sample_bins(max)?;
        let mut bins = vec![0.0; n];
        for (&value, &count) in values.iter().zip(counts) {
            bins[value as usize] += count;
        }
        let mut dist = Self::from_vec(n as f64, bins);
        dist.normalize_density();
        Ok(dist)
    }

    /// Histogram of samples given as text (`;`, tab or newline separated).
    ///
    /// # Errors
    ///
    /// [`DistributionError::InvalidSample`] if a token is not a non-negative
    /// integer.
    pub fn from_sample_text(text: Option<&str>, normalize: bool) -> Result<Self> {
        Self::from_sample_texts(text.as_slice(), normalize)
    }

    /// Histogram over several text sample collections merged together.
    ///
    /// # Errors
    ///
    /// [`DistributionError::InvalidSample`] for a token that is not a
    /// non-negative integer.
    pub fn from_sample_texts(texts: &[&str], normalize: bool) -> Result<Self> {
        let sets = texts
            .iter()
            .map(|text| parse_samples(text))
            .collect::<Result<Vec<Vec<u32>>>>()?;
        let slices: Vec<&[u32]> = sets.iter().map(Vec::as_slice).collect();
        Self::from_sample_sets(&slices, normalize)
    }

    // -----------------------------------------------------------------------
    // Output
    // -----------------------------------------------------------------------

    /// Joins the bins with `separator`, formatting each value per `locale`.
    pub fn to_text(&self, separator: &str, locale: Locale) -> String {
        join(&self.bins, separator, |v| locale.format_number(v))
    }

    /// `;`-separated, locale-independent text; the storage format.
    pub fn to_text_default(&self) -> String {
        self.to_text(DEFAULT_SEPARATOR, Locale::INVARIANT)
    }

    /// Like [`to_text`](Self::to_text) but drops trailing zero bins. At
    /// least two values are written when there are two bins or more.
    pub fn to_text_trimmed(&self, separator: &str, locale: Locale) -> String {
        let last = self.bins.iter().rposition(|&b| b != 0.0).unwrap_or(0);
        let end = (last + 1).max(2).min(self.bins.len());
        join(&self.bins[..end], separator, |v| locale.format_number(v))
    }

    /// `;`-separated percentages (`value·100`, up to three decimals, `%`).
    pub fn to_percent_text(&self, locale: Locale) -> String {
        join(&self.bins, DEFAULT_SEPARATOR, |v| locale.format_percent(v))
    }
}

/// Bin count for samples up to `max`.
fn sample_bins(max: u32) -> Result<usize> {
    if max > MAX_SAMPLE_VALUE {
        warn!(value = max, limit = MAX_SAMPLE_VALUE, "sample too large for a histogram");
        return Err(DistributionError::SampleTooLarge {
            value: max,
            max: MAX_SAMPLE_VALUE,
        });
    }
    Ok(max as usize + 1)
}

fn join(values: &[f64], separator: &str, format: impl Fn(f64) -> String) -> String {
    values
        .iter()
        .map(|&v| format(v))
        .collect::<Vec<_>>()
        .join(separator)
}

fn parse_samples(text: &str) -> Result<Vec<u32>> {
    if text.is_empty() {
        return Ok(Vec::new());
    }
    split_tokens(text, &ANY_SEPARATORS)
        .into_iter()
        .enumerate()
        .map(|(index, token)| {
            token
                .trim()
                .parse::<u32>()
                .map_err(|_| DistributionError::InvalidSample {
                    index,
                    token: token.to_string(),
                })
        })
        .collect()
}

impl fmt::Display for BinnedDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text_default())
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn text_round_trip(
            bins in proptest::collection::vec(-1e6_f64..1e6, 1..=40),
            german in proptest::bool::ANY,
            sep in proptest::sample::select(vec![";", "\t", "\n"]),
        ) {
            let locale = if german { Locale::GERMAN } else { Locale::INVARIANT };
            let d = BinnedDistribution::from_values(10.0, &bins);
            let text = d.to_text(sep, locale);
            let back = BinnedDistribution::from_any_text(Some(&text), 10.0).unwrap();
            prop_assert_eq!(back.len(), bins.len());
            for (a, b) in back.bins().iter().zip(&bins) {
                prop_assert!((a - b).abs() <= 1e-10, "{a} vs {b}");
            }
        }
    }
}

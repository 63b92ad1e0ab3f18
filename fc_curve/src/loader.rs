use csv::{ReaderBuilder, StringRecord, Trim};

use crate::{Params, Point};

pub fn load_samples(text: &str, params: &Params) -> Vec<Point> {
    let body = skip_lines(text.trim_start_matches('\u{feff}'), params.header_lines);
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(body.as_bytes());

    let (x_col, y_col) = match reader.headers() {
        Ok(headers) => (
            find_column(headers, &params.displacement_column),
            find_column(headers, &params.force_column),
        ),
        Err(_) => (None, None),
    };

    let mut out = Vec::new();
    for row in reader.records() {
        let point = match row {
            Ok(record) => Point::new(field_f64(&record, x_col), field_f64(&record, y_col)),
            Err(_) => Point::ORIGIN,
        };
        if point.x >= 0.0 {
            out.push(point);
        }
    }
    out
}

pub fn is_excluded(file_name: &str, params: &Params) -> bool {
    file_name
        .to_lowercase()
        .contains(&params.exclude_pattern.to_lowercase())
}

fn skip_lines(text: &str, count: usize) -> &str {
    let mut rest = text;
    for _ in 0..count {
        match rest.find('\n') {
            Some(idx) => rest = &rest[idx + 1..],
            None => return "",
        }
    }
    rest
}

fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    let wanted = name.trim().to_lowercase();
    headers
        .iter()
        .position(|h| h.trim().to_lowercase().starts_with(&wanted))
}

fn field_f64(record: &StringRecord, column: Option<usize>) -> f64 {
    column
        .and_then(|idx| record.get(idx))
        .and_then(|raw| raw.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(header_lines: usize) -> Params {
        Params {
            header_lines,
            ..Params::default()
        }
    }

    #[test]
    fn test_skips_header_lines_and_reads_named_columns() {
        let text = "Switch: Test\nTested by: bench\n\
                    No.,Force (gf),Displacement (mm)\n\
                    1,35.5,0.00\n2,36.1,0.05\n3,37.0,0.10\n";
        let points = load_samples(text, &params(2));
        assert_eq!(
            points,
            vec![
                Point::new(0.0, 35.5),
                Point::new(0.05, 36.1),
                Point::new(0.10, 37.0)
            ]
        );
    }

    #[test]
    fn test_unparsable_fields_default_to_zero() {
        let text = "displacement,force\n0.1,abc\nfoo,12\n0.3\n0.4,nan\n";
        let points = load_samples(text, &params(0));
        assert_eq!(
            points,
            vec![
                Point::new(0.1, 0.0),
                Point::new(0.0, 12.0),
                Point::new(0.3, 0.0),
                Point::new(0.4, 0.0)
            ]
        );
    }

    #[test]
    fn test_negative_displacement_discarded() {
        let text = "displacement,force\n-0.02,1\n0.0,2\n-1e-3,3\n0.5,4\n";
        let points = load_samples(text, &params(0));
        assert!(points.iter().all(|p| p.x >= 0.0));
        assert_eq!(points, vec![Point::new(0.0, 2.0), Point::new(0.5, 4.0)]);
    }

    #[test]
    fn test_missing_column_reads_zero() {
        let text = "displacement,weight\n0.1,5\n0.2,6\n";
        let points = load_samples(text, &params(0));
        assert_eq!(points, vec![Point::new(0.1, 0.0), Point::new(0.2, 0.0)]);
    }

    #[test]
    fn test_header_only_or_short_file_is_empty() {
        assert!(load_samples("a\nb\n", &params(5)).is_empty());
        assert!(load_samples("", &params(0)).is_empty());
        assert!(load_samples("displacement,force\n", &params(0)).is_empty());
    }

    #[test]
    fn test_crlf_and_bom() {
        let text = "\u{feff}meta\r\nDisplacement,Force\r\n0.25,40.5\r\n";
        let points = load_samples(text, &params(1));
        assert_eq!(points, vec![Point::new(0.25, 40.5)]);
    }

    #[test]
    fn test_is_excluded_case_insensitive() {
        let p = Params::default();
        assert!(is_excluded("Gateron Yellow HighResolutionRaw.csv", &p));
        assert!(is_excluded("gateron yellow highresolutionraw.csv", &p));
        assert!(!is_excluded("Gateron Yellow Raw Data CSV.csv", &p));
    }
}

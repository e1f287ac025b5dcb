#![cfg(not(tarpaulin_include))]
#![cfg(feature = "web")]
use crate::aggregate::{CategoryAggregate, UserAggregate};
use plotters::prelude::*;
use std::io::Cursor;

/// Configuration options for chart generation
#[derive(Clone, Debug)]
pub struct GraphOptions {
    /// Title displayed at the top of the graph
    pub title: String,

    /// Label for the X-axis
    pub x_label: String,

    /// Label for the Y-axis
    pub y_label: String,

    /// Width of the graph in pixels
    pub width: u32,

    /// Height of the graph in pixels
    pub height: u32,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            title: "Graph".to_string(),
            x_label: "X Axis".to_string(),
            y_label: "Ethanol (litres)".to_string(),
            width: 900,
            height: 500,
        }
    }
}

impl GraphOptions {
    /// Labels for the ethanol-by-waste-type chart.
    pub fn categories() -> Self {
        Self {
            title: "Ethanol Production by Waste Type".to_string(),
            x_label: "Waste Type".to_string(),
            ..Self::default()
        }
    }

    /// Labels for the leaderboard chart.
    pub fn contributors() -> Self {
        Self {
            title: "Top Contributors by Ethanol Produced".to_string(),
            x_label: "User".to_string(),
            ..Self::default()
        }
    }
}

/// One labelled bar
pub type Bar = (String, f64);

pub fn category_bars(rows: &[CategoryAggregate]) -> Vec<Bar> {
    rows.iter()
        .map(|row| (row.category.clone(), row.ethanol))
        .collect()
}

pub fn user_bars(rows: &[UserAggregate]) -> Vec<Bar> {
    rows.iter()
        .map(|row| (row.user.clone(), row.total_ethanol))
        .collect()
}

/// Upper bound of the value axis, leaving headroom above the tallest bar
///
/// Falls back to 1.0 so an empty chart still has a drawable axis.
pub fn y_axis_max(bars: &[Bar]) -> f64 {
    let tallest = bars.iter().map(|(_, v)| *v).fold(0.0, f64::max);
    if tallest > 0.0 { tallest * 1.1 } else { 1.0 }
}

/// Render ethanol per waste category as a PNG bar chart
///
/// # Arguments
/// * `rows` - Output of [`crate::aggregate::by_category`], in display order
/// * `options` - Title, axis labels and image size
///
/// # Returns
/// * PNG bytes, or the plotting / encoding error
pub fn category_chart(
    rows: &[CategoryAggregate],
    options: &GraphOptions,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    create_bar_graph(&category_bars(rows), options)
}

/// Render the contributor leaderboard as a PNG bar chart.
pub fn user_chart(
    rows: &[UserAggregate],
    options: &GraphOptions,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    create_bar_graph(&user_bars(rows), options)
}

/// Creates a bar graph from labelled values
///
/// Draws into an in-memory RGB buffer and encodes it as PNG. Each bar gets
/// its own palette colour, and labels sit under the bar centres.
///
/// # Arguments
/// * `bars` - Label and height of each bar, left to right
/// * `options` - Title, axis labels and image size
///
/// # Returns
/// * PNG bytes, or the plotting / encoding error
fn create_bar_graph(
    bars: &[Bar],
    options: &GraphOptions,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let (width, height) = (options.width, options.height);
    let mut buffer = vec![0u8; width as usize * height as usize * 3];

    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE)?;

        let segments = bars.len().max(1) as u32;
        let labels: Vec<&str> = bars.iter().map(|(label, _)| label.as_str()).collect();
        let label_of = |value: &SegmentValue<u32>| match value {
            SegmentValue::CenterOf(i) => labels.get(*i as usize).map(|s| s.to_string()).unwrap_or_default(),
            _ => String::new(),
        };

        let mut chart = ChartBuilder::on(&root)
            .caption(&options.title, ("sans-serif", 30).into_font())
            .margin(10)
            .x_label_area_size(50)
            .y_label_area_size(60)
            .build_cartesian_2d((0u32..segments).into_segmented(), 0f64..y_axis_max(bars))?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(segments as usize)
            .x_label_formatter(&label_of)
            .x_desc(&options.x_label)
            .y_desc(&options.y_label)
            .draw()?;

        chart.draw_series(bars.iter().enumerate().map(|(i, (_, value))| {
            let i = i as u32;
            let mut bar = Rectangle::new(
                [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), *value)],
                Palette99::pick(i as usize).filled(),
            );
            bar.set_margin(0, 0, 6, 6);
            bar
        }))?;

        root.present()?;
    }

    let bitmap = image::RgbImage::from_raw(width, height, buffer)
        .ok_or("chart buffer does not match its dimensions")?;
    let mut png = Cursor::new(Vec::new());
    bitmap.write_to(&mut png, image::ImageOutputFormat::Png)?;
    Ok(png.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bars_follow_aggregate_order() {
        let rows = vec![
            CategoryAggregate { category: "Algae".into(), ethanol: 6.0 },
            CategoryAggregate { category: "Tea Powder Waste".into(), ethanol: 1.0 },
        ];
        assert_eq!(
            category_bars(&rows),
            vec![("Algae".to_string(), 6.0), ("Tea Powder Waste".to_string(), 1.0)]
        );

        let users = vec![UserAggregate { user: "A".into(), total_quantity: 14.0, total_ethanol: 6.0 }];
        assert_eq!(user_bars(&users), vec![("A".to_string(), 6.0)]);
    }

    #[test]
    fn axis_has_headroom_and_survives_empty_input() {
        assert_eq!(y_axis_max(&[]), 1.0);
        assert_eq!(y_axis_max(&[("x".into(), 0.0)]), 1.0);
        assert!((y_axis_max(&[("x".into(), 10.0), ("y".into(), 2.0)]) - 11.0).abs() < 1e-9);
    }

    #[test]
    fn chart_titles_match_the_dashboard_tabs() {
        assert_eq!(GraphOptions::categories().x_label, "Waste Type");
        assert_eq!(GraphOptions::contributors().title, "Top Contributors by Ethanol Produced");
        assert_eq!(GraphOptions::contributors().y_label, "Ethanol (litres)");
    }
}

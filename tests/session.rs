mod common;

use std::io::Cursor;

use common::{TestWorkspace, date, dec, sample_dataset};
use superstore_dash::{
    error::SelectionError,
    filter::{Dimension, FilterSelection},
    preset::FilterPreset,
    render::{JsonRenderer, TextRenderer},
    session::{self, FilterEvent, Session},
};

#[test]
fn events_recompute_every_tab() {
    let dataset = sample_dataset();
    let mut session = Session::new(&dataset, FilterSelection::all());
    assert_eq!(session.snapshot().view.len(), 12);

    session
        .apply(&FilterEvent::SetStart(Some(date(2016, 1, 1))))
        .expect("start");
    let snapshot = session
        .apply(&FilterEvent::SetEnd(Some(date(2016, 12, 31))))
        .expect("end");
    assert_eq!(snapshot.view.len(), 4);
    assert_eq!(snapshot.overview.metrics.total_sales, dec("1416.496"));
    assert_eq!(snapshot.sales.top_customers[0].key, "Claire Gute");
    assert!(snapshot.profit.losses.is_none());

    let snapshot = session
        .apply(&FilterEvent::Select(
            Dimension::Region,
            vec!["West".to_string()],
        ))
        .expect("region");
    assert_eq!(snapshot.view.len(), 2);
    assert_eq!(snapshot.overview.metrics.total_sales, dec("422.596"));
}

#[test]
fn inverted_range_keeps_previous_selection() {
    let dataset = sample_dataset();
    let start = FilterSelection::with_range(Some(date(2016, 1, 1)), None).expect("range");
    let mut session = Session::new(&dataset, start.clone());

    let err = session
        .apply(&FilterEvent::SetEnd(Some(date(2015, 1, 1))))
        .expect_err("end before start");
    assert_eq!(
        err,
        SelectionError::InvertedRange {
            start: date(2016, 1, 1),
            end: date(2015, 1, 1),
        }
    );
    assert_eq!(session.selection(), &start);
}

#[test]
fn toggle_and_reset_round_trip_to_all() {
    let dataset = sample_dataset();
    let mut session = Session::new(&dataset, FilterSelection::all());
    let narrowed = session
        .apply(&FilterEvent::Toggle(Dimension::Category, "Technology".to_string()))
        .expect("toggle on");
    assert_eq!(narrowed.view.len(), 1);

    let widened = session
        .apply(&FilterEvent::Toggle(Dimension::Category, "Technology".to_string()))
        .expect("toggle off");
    assert_eq!(widened.view.len(), 12);

    session
        .apply(&FilterEvent::Select(
            Dimension::Segment,
            vec!["Corporate".to_string()],
        ))
        .expect("segment");
    let reset = session.apply(&FilterEvent::Reset).expect("reset");
    assert_eq!(reset.view.len(), 12);
    assert_eq!(session.selection(), &FilterSelection::all());
}

#[test]
fn interactive_session_renders_after_each_change() {
    let dataset = sample_dataset();
    let mut session = Session::new(&dataset, FilterSelection::all());
    let input = Cursor::new(
        "select region South\n\
         end 2010-01-01\n\
         start 2017-01-01\n\
         end *\n\
         bogus\n\
         show profit\n\
         quit\n\
         reset\n",
    );
    let mut output = Vec::new();
    session::run_interactive(&mut session, &TextRenderer::default(), input, &mut output)
        .expect("run session");
    let text = String::from_utf8(output).expect("utf-8 output");

    assert_eq!(text.matches("== Overview ==").count(), 4);
    assert!(text.contains("Filters: order date *..*; region in [South]"));
    assert!(text.contains("error: Start date 2017-01-01 is after end date 2010-01-01"));
    assert!(text.contains("error: Unknown command 'bogus'"));
    assert!(text.contains("== Profit/Loss Analysis =="));
    assert!(text.contains("(no data)"));
    assert_eq!(
        session.selection().to_string(),
        "order date *..*; region in [South]"
    );
}

#[test]
fn interactive_save_writes_loadable_preset() {
    let workspace = TestWorkspace::new();
    let preset_path = workspace.path().join("filters.yaml");
    let dataset = sample_dataset();
    let mut session = Session::new(&dataset, FilterSelection::all());
    let script = format!(
        "select category Furniture, Technology\nstart 2015-01-01\nsave {}\n",
        preset_path.display()
    );
    let mut output = Vec::new();
    session::run_interactive(
        &mut session,
        &JsonRenderer::default(),
        Cursor::new(script),
        &mut output,
    )
    .expect("run session");
    let text = String::from_utf8(output).expect("utf-8 output");
    assert!(text.contains("saved filters to"));

    let preset = FilterPreset::load(&preset_path).expect("load preset");
    let restored = preset.to_selection().expect("valid preset");
    assert_eq!(&restored, session.selection());
    assert_eq!(restored.start(), Some(date(2015, 1, 1)));
    assert_eq!(
        restored.values(Dimension::Category).collect::<Vec<_>>(),
        ["Furniture", "Technology"]
    );
}

#[test]
fn interactive_export_without_path_writes_to_session_output() {
    let dataset = sample_dataset();
    let mut session = Session::new(&dataset, FilterSelection::all());
    let input = Cursor::new("select category Technology\nexport\nexport -\nquit\n");
    let mut output = Vec::new();
    session::run_interactive(&mut session, &TextRenderer::default(), input, &mut output)
        .expect("run session");
    let text = String::from_utf8(output).expect("utf-8 output");

    assert_eq!(text.matches("Row ID,Order ID,Order Date").count(), 2);
    assert_eq!(
        text.matches("Mitel 5320 IP Phone VoIP phone,907.152,6,0.2,90.7152")
            .count(),
        2
    );
    assert!(!text.contains("Claire Gute,"));
    assert_eq!(text.matches("exported 1 row(s)").count(), 2);
}

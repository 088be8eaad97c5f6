//! Built-in scenarios, one per combination of value types and tablet representation that the
//! benchmark is meant to compare.

use iotdb_client::TSDataType;

use crate::{encoder::Encoding, specification::ScenarioSpec};

const FULL_ROWS: usize = 10_000;
const FULL_COLUMNS: usize = 2_000;

const NUMERIC: [TSDataType; 5] = [
    TSDataType::Boolean,
    TSDataType::Float,
    TSDataType::Double,
    TSDataType::Int32,
    TSDataType::Int64,
];

pub fn built_in_scenarios() -> Vec<ScenarioSpec> {
    let all_types = {
        let mut types = NUMERIC.to_vec();
        types.push(TSDataType::Text);
        types
    };

    let mut scenarios = vec![ScenarioSpec {
        name: "smoke".to_string(),
        data_types: vec![TSDataType::Float],
        encoding: Encoding::Row,
        validate: true,
        rows: 3,
        columns: 1,
    }];
    for (prefix, data_types) in [
        ("float", vec![TSDataType::Float]),
        ("numeric", NUMERIC.to_vec()),
        ("all_types", all_types),
    ] {
        for encoding in [Encoding::Row, Encoding::Columnar] {
            scenarios.push(ScenarioSpec {
                name: format!("{prefix}_{encoding}"),
                data_types: data_types.clone(),
                encoding,
                validate: false,
                rows: FULL_ROWS,
                columns: FULL_COLUMNS,
            });
        }
    }
    scenarios
}

pub fn built_in_scenario_names() -> Vec<String> {
    built_in_scenarios().into_iter().map(|s| s.name).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn names() {
        assert_eq!(
            built_in_scenario_names(),
            [
                "smoke",
                "float_row",
                "float_columnar",
                "numeric_row",
                "numeric_columnar",
                "all_types_row",
                "all_types_columnar",
            ]
        );
        let unique: HashSet<_> = built_in_scenario_names().into_iter().collect();
        assert_eq!(unique.len(), built_in_scenarios().len());
    }

    #[test]
    fn full_scenarios_cover_every_type() {
        let all = built_in_scenarios()
            .into_iter()
            .find(|s| s.name == "all_types_columnar")
            .unwrap();
        assert_eq!(all.data_types.len(), TSDataType::ALL.len());
        assert_eq!((all.rows, all.columns), (10_000, 2_000));
        assert_eq!(all.encoding, Encoding::Columnar);
    }
}

//! Integration tests for the query helpers
//!
//! Every query runs against a scripted Pm-3m engine that answers from its
//! remembered values and shows, one fresh engine per session.

#[path = "../test_utils/mod.rs"]
mod test_utils;

use isodrive::engine::fixture::display_block;
use isodrive::queries::{element_list, filter_by_basis, DistortionQuery, DomainQuery};
use isodrive::{Error, ProtocolConfig, QueryClient, ScriptedLauncher, SessionOptions, Value};
use test_utils::fixtures::{
    COUPLED_221_R4_M3, DIRECTION_221, DISTORTION_221_R4, IRREP_GM_221, IRREP_R_221, ISOTROPY_221_R4,
    KPOINT_221, MATRIX_221_R4, PARENT_221,
};
use test_utils::{lines, stateful_engine, EngineState};

fn table(rows: &[&str]) -> Vec<String> {
    display_block(rows.iter().copied())
}

/// Pm-3m as far as the fixtures cover it
fn respond_221(state: &EngineState, name: &str, coupled: &str) -> Option<Vec<String>> {
    if state.value("PARENT") != Some("221") {
        return None;
    }
    match name {
        "KPOINT" => Some(table(KPOINT_221)),
        "PARENT" => Some(table(PARENT_221)),
        "IRREP" if state.shows.contains("MATRIX") => Some(table(MATRIX_221_R4)),
        "IRREP" => match state.value("KPOINT") {
            Some("R") => Some(table(IRREP_R_221)),
            Some("GM") => Some(table(IRREP_GM_221)),
            _ => None,
        },
        "ISOTROPY" if state.value("SUBGROUP") == Some("999") => Some(lines(&[
            " not all elements of the subgroup are elements of parent group",
            "",
            "*",
        ])),
        "ISOTROPY" => Some(table(ISOTROPY_221_R4)),
        "ISOTROPY COUPLED" if state.value("IRREP") == Some(coupled) => Some(table(COUPLED_221_R4_M3)),
        "DISTORTION" => Some(table(DISTORTION_221_R4)),
        "DIRECTION" => Some(table(DIRECTION_221)),
        _ => None,
    }
}

fn client(coupled: &'static str) -> QueryClient<ScriptedLauncher> {
    let launcher = stateful_engine(move |state, name| respond_221(state, name, coupled));
    QueryClient::new(launcher, ProtocolConfig::default())
}

/// Every session the client opened was closed and cleaned up
fn assert_all_closed(client: &QueryClient<ScriptedLauncher>) {
    let launcher = client.launcher();
    assert_eq!(launcher.terminations(), launcher.launches());
    assert_eq!(launcher.cleanups(), launcher.launches());
}

#[cfg(test)]
mod lookup_tests {
    use super::*;

    #[tokio::test]
    async fn test_kpoints() {
        let client = client("");
        let kpoints = client.kpoints("221", SessionOptions::new()).await.unwrap();
        assert_eq!(
            kpoints.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["GM", "R", "M", "X", "DT"]
        );
        assert_eq!(kpoints["M"], Value::atoms(["1/2", "1/2", "0"]));
        assert_all_closed(&client);
    }

    #[tokio::test]
    async fn test_irreps_at_kpoint() {
        let client = client("");
        let irreps = client.irreps("221", Some("R"), SessionOptions::new()).await.unwrap();
        assert_eq!(irreps, vec!["R1+", "R4-", "R5+"]);
        assert!(client
            .launcher()
            .commands(0)
            .contains(&"VALUE KPOINT R".to_string()));
    }

    #[tokio::test]
    async fn test_extra_options_override_query_values() {
        let client = client("");
        let irreps = client
            .irreps("221", Some("R"), SessionOptions::new().value("PARENT", 225).setting("MILLER-LOVE"))
            .await
            .unwrap();
        assert!(irreps.is_empty());

        let commands = client.launcher().commands(0);
        assert!(commands.contains(&"SETTING MILLER-LOVE".to_string()));
        assert!(!commands.contains(&"SETTING INTERNATIONAL".to_string()));
        assert!(commands.contains(&"VALUE PARENT 225".to_string()));
        assert!(!commands.contains(&"VALUE PARENT 221".to_string()));
    }

    #[tokio::test]
    async fn test_symmetry_operations() {
        let client = client("");
        let elements = client.symmetry_operations("221", SessionOptions::new()).await.unwrap();
        assert_eq!(element_list(&elements).len(), 3);
    }

    #[tokio::test]
    async fn test_symmetry_operations_with_matrix() {
        let client = client("");
        let records = client
            .symmetry_operations_with_matrix("221", None, SessionOptions::new())
            .await
            .unwrap();
        assert_eq!(records.len(), 1);

        let commands = client.launcher().commands(0);
        assert!(commands.contains(&"VALUE LATTICE PARAMETER 1 1 1 90 90 90".to_string()));
        assert!(commands.contains(&"SHOW CARTESIAN".to_string()));
        assert!(commands.contains(&"SHOW ELEMENTS".to_string()));
    }

    #[tokio::test]
    async fn test_representations_per_element() {
        let client = client("");
        let matrices = client
            .representations("221", "R", Some(vec!["R4-".to_string()]), SessionOptions::new())
            .await
            .unwrap();
        assert_eq!(matrices.len(), 1);
        assert_eq!(matrices["R4-"].len(), 3);
        assert_eq!(
            matrices["R4-"][0].to_f64_matrix().unwrap()[1],
            vec![0.0, -1.0, 0.0]
        );

        // one launch for the elements, one for the matrices
        let launcher = client.launcher();
        assert_eq!(launcher.launches(), 2);
        let commands = launcher.commands(1);
        assert!(commands.contains(&"VALUE ELEMENT C2x 0 0 0".to_string()));
        assert_eq!(commands.iter().filter(|c| *c == "DISPLAY IRREP").count(), 3);
        assert_all_closed(&client);
    }

    #[tokio::test]
    async fn test_representations_default_to_all_irreps() {
        let client = client("");
        let matrices = client
            .representations("221", "GM", None, SessionOptions::new())
            .await
            .unwrap();
        assert_eq!(
            matrices.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["GM1+", "GM4-"]
        );
        assert_eq!(client.launcher().launches(), 3);
    }

    #[tokio::test]
    async fn test_directions_send_basis_and_origin() {
        let client = client("");
        let basis = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 2.0]];
        let records = client
            .directions("221", &basis, &[0.5, 0.0, 0.0], None, SessionOptions::new())
            .await
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["Dir"], Value::atom("P1"));

        let commands = client.launcher().commands(0);
        assert!(commands.contains(&"VALUE SUBGROUP 1".to_string()));
        assert!(commands.contains(&"VALUE BASIS 1,0,0 0,1,0 0,0,2".to_string()));
        assert!(commands.contains(&"VALUE ORIGIN 1/2,0,0".to_string()));
    }
}

#[cfg(test)]
mod subgroup_tests {
    use super::*;

    #[tokio::test]
    async fn test_domains() {
        let client = client("");
        let records = client
            .domains(&DomainQuery::new("221", "R4-").direction("P1"), SessionOptions::new())
            .await
            .unwrap();
        assert_eq!(records.len(), 3);

        let commands = client.launcher().commands(0);
        assert!(commands.contains(&"VALUE DIRECTION P1".to_string()));
        assert!(commands.contains(&"SHOW DOMAINS".to_string()));
    }

    #[tokio::test]
    async fn test_distortion_with_cell() {
        let client = client("");
        let query = DistortionQuery::new("221", ["a", "b"], "R4-")
            .cell(vec![vec![2.0, 0.0, 0.0], vec![0.0, 2.0, 0.0], vec![0.0, 0.0, 2.0]]);
        let records = client.distortion(&query, SessionOptions::new()).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["Wyckoff"], Value::atom("b"));
        assert!(client
            .launcher()
            .commands(0)
            .contains(&"VALUE CELL 2,0,0 0,2,0 0,0,2".to_string()));
    }

    #[tokio::test]
    async fn test_single_irrep_order_parameters() {
        let client = client("");
        let records = client
            .single_irrep_order_parameters("221", "140", SessionOptions::new())
            .await
            .unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0]["Subgroup"], Value::atoms(["140", "I4/mcm"]));
    }

    #[tokio::test]
    async fn test_subgroup_mismatch_surfaces_and_closes() {
        let client = client("");
        let result = client
            .single_irrep_order_parameters("221", "999", SessionOptions::new())
            .await;
        assert!(matches!(result, Err(Error::SubgroupMismatch)));
        assert_all_closed(&client);
    }

    #[tokio::test]
    async fn test_coupled_order_parameters_tag_combinations() {
        let client = client("R4- M3+");
        let irreps = ["R4-", "M3+", "GM1+"].map(String::from).to_vec();
        let records = client
            .coupled_irrep_order_parameters("221", None, Some(irreps), 2, SessionOptions::new())
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["Irreps"], Value::atoms(["R4-", "M3+"]));
        assert_eq!(records[0]["Irrep (ML)"], Value::atoms(["R4-", "M3+"]));

        let commands = client.launcher().commands(0);
        assert_eq!(
            commands.iter().filter(|c| *c == "DISPLAY ISOTROPY COUPLED").count(),
            3
        );
    }

    #[tokio::test]
    async fn test_coupled_default_irreps_skip_parametrised_kpoints() {
        let client = client("");
        let records = client
            .coupled_irrep_order_parameters("221", Some("127"), None, 2, SessionOptions::new())
            .await
            .unwrap();
        assert!(records.is_empty());

        // kpoints, then irreps at GM, R, M and X, then the coupled session
        let launcher = client.launcher();
        assert_eq!(launcher.launches(), 6);
        assert!(!launcher.all_commands().contains(&"VALUE KPOINT DT".to_string()));
        let coupled = launcher.commands(5);
        assert!(coupled.contains(&"VALUE SUBGROUP 127".to_string()));
        // GM1+ GM4- R1+ R4- R5+ taken two at a time
        assert_eq!(
            coupled.iter().filter(|c| *c == "DISPLAY ISOTROPY COUPLED").count(),
            10
        );
        assert_all_closed(&client);
    }

    #[tokio::test]
    async fn test_coupled_run_survives_a_crash() {
        let launcher = stateful_engine(|state, name| {
            if state.launch == 0 && state.displays == 2 {
                return Some(lines(&[" Program has bombed"]));
            }
            respond_221(state, name, "R4- GM1+")
        });
        let client = QueryClient::new(launcher, ProtocolConfig::default());
        let irreps = ["R4-", "M3+", "GM1+"].map(String::from).to_vec();
        let records = client
            .coupled_irrep_order_parameters("221", None, Some(irreps), 2, SessionOptions::new())
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["Irreps"], Value::atoms(["R4-", "GM1+"]));

        let launcher = client.launcher();
        assert_eq!(launcher.launches(), 2);
        assert!(launcher.commands(1).contains(&"VALUE IRREP R4- GM1+".to_string()));
    }
}

#[cfg(test)]
mod basis_filter_tests {
    use super::*;

    #[tokio::test]
    async fn test_order_parameters_for_basis() {
        let client = client("R4- R5+");
        let basis = [[-1.0, 1.0, 0.0], [1.0, 1.0, 0.0], [0.0, 0.0, 2.0]];
        let records = client
            .order_parameters_for_basis("221", "140", &basis, &[0.0, 0.0, 1.0], 2)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["Dir"], Value::atom("P1"));
        assert_all_closed(&client);
    }

    #[test]
    fn test_filter_matches_coupled_origin() {
        let records = isodrive::parse_block(COUPLED_221_R4_M3);
        let basis = [[0.0, 0.0, 1.0], [1.0, 1.0, 0.0], [-1.0, 1.0, 0.0]];
        assert_eq!(filter_by_basis(records.clone(), &basis, &[0.5, -0.5, 0.0]).len(), 1);
        assert!(filter_by_basis(records, &basis, &[0.0, 0.0, 0.0]).is_empty());
    }

    #[test]
    fn test_filter_skips_non_numeric_basis() {
        let mut records = isodrive::parse_block(ISOTROPY_221_R4);
        records[0].insert("Basis Vectors".to_string(), Value::atoms(["a", "b", "c"]));
        let basis = [[1.0, 1.0, 0.0], [-1.0, 1.0, 0.0], [0.0, 0.0, 2.0]];
        assert!(filter_by_basis(records, &basis, &[0.0, 0.0, 0.0]).is_empty());
    }
}

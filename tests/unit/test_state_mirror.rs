//! Unit tests for the remote state mirror and command wire text

#[path = "../test_utils/mod.rs"]
mod test_utils;

use isodrive::{EngineCommand, Error, PageMode, ProtocolConfig, Session, SessionOptions, ShowSet, ValueMap};
use isodrive::engine::fixture::{banner, prompt};
use test_utils::stateful_engine;

#[cfg(test)]
mod wire_text_tests {
    use super::*;

    #[test]
    fn test_command_text() {
        let cases = [
            (EngineCommand::Screen(999), "SCREEN 999"),
            (EngineCommand::Page(PageMode::Lines(999)), "PAGE 999"),
            (EngineCommand::Page(PageMode::NoBreak), "PAGE NOBREAK"),
            (EngineCommand::Setting("MILLER-LOVE".into()), "SETTING MILLER-LOVE"),
            (
                EngineCommand::Value {
                    key: "LATTICE PARAMETER".into(),
                    value: "1 1 1 90 90 90".into(),
                },
                "VALUE LATTICE PARAMETER 1 1 1 90 90 90",
            ),
            (EngineCommand::CancelValue("KVALUE".into()), "CANCEL VALUE KVALUE"),
            (EngineCommand::CancelValueAll, "CANCEL VALUE ALL"),
            (EngineCommand::Show("MICROSCOPIC VECTOR".into()), "SHOW MICROSCOPIC VECTOR"),
            (EngineCommand::CancelShow("IRREP".into()), "CANCEL SHOW IRREP"),
            (EngineCommand::CancelShowAll, "CANCEL SHOW ALL"),
            (EngineCommand::Display("ISOTROPY COUPLED".into()), "DISPLAY ISOTROPY COUPLED"),
            (EngineCommand::Acknowledge, ""),
            (EngineCommand::Quit, "QUIT"),
        ];
        for (command, text) in cases {
            assert_eq!(command.to_string(), text);
        }
    }

    #[test]
    fn test_page_mode_from_option() {
        assert_eq!(PageMode::from(Some(50)), PageMode::Lines(50));
        assert_eq!(PageMode::from(None), PageMode::NoBreak);
    }
}

#[cfg(test)]
mod mirror_tests {
    use super::*;

    #[test]
    fn test_value_set_get_delete() {
        let mut values = ValueMap::new();
        assert!(values.set("Parent", "221").is_some());
        assert!(values.set("PARENT", "221").is_none());
        assert_eq!(values.get("parent"), Some("221"));
        assert!(values.delete("parent").is_ok());
        assert!(matches!(values.delete("parent"), Err(Error::KeyNotFound { .. })));
    }

    #[test]
    fn test_show_remove_absent_is_silent() {
        let mut shows = ShowSet::new();
        assert_eq!(shows.remove("IRREP"), None);
        shows.add("irrep");
        shows.add("subgroup");
        assert_eq!(shows.iter().collect::<Vec<_>>(), vec!["IRREP", "SUBGROUP"]);
        assert_eq!(shows.clear_all(), EngineCommand::CancelShowAll);
        assert!(shows.is_empty());
    }
}

#[cfg(test)]
mod session_mirror_tests {
    use super::*;

    async fn open() -> (isodrive::ScriptedLauncher, Session<isodrive::ScriptedLauncher>) {
        let launcher = stateful_engine(|_, _| None);
        let session = Session::open(launcher.clone(), ProtocolConfig::default(), SessionOptions::new())
            .await
            .unwrap();
        (launcher, session)
    }

    /// Commands written after console setup
    fn traffic(launcher: &isodrive::ScriptedLauncher) -> Vec<String> {
        launcher.commands(0)[3..].to_vec()
    }

    #[tokio::test]
    async fn test_repeated_value_sends_once() {
        let (launcher, mut session) = open().await;
        assert!(session.set_value("PARENT", "221").await.unwrap());
        assert!(!session.set_value("parent", "221").await.unwrap());
        assert!(session.set_value("PARENT", "225").await.unwrap());
        session.close().await.unwrap();
        assert_eq!(
            traffic(&launcher),
            vec!["VALUE PARENT 221", "VALUE PARENT 225", "QUIT"]
        );
    }

    #[tokio::test]
    async fn test_delete_unknown_value_sends_nothing() {
        let (launcher, mut session) = open().await;
        assert!(matches!(
            session.delete_value("KVALUE").await,
            Err(Error::KeyNotFound { ref key }) if key == "KVALUE"
        ));
        session.close().await.unwrap();
        assert_eq!(traffic(&launcher), vec!["QUIT"]);
    }

    #[tokio::test]
    async fn test_shows_are_deduplicated() {
        let (launcher, mut session) = open().await;
        let sent = session.update_shows(["irrep", "IRREP", "subgroup"]).await.unwrap();
        assert_eq!(sent, 2);
        assert!(!session.remove_show("basis").await.unwrap());
        assert!(session.remove_show("Irrep").await.unwrap());
        assert_eq!(session.shows().iter().collect::<Vec<_>>(), vec!["SUBGROUP"]);
        session.close().await.unwrap();
        assert_eq!(
            traffic(&launcher),
            vec!["SHOW IRREP", "SHOW SUBGROUP", "CANCEL SHOW IRREP", "QUIT"]
        );
    }

    #[tokio::test]
    async fn test_clear_all_is_one_command() {
        let (launcher, mut session) = open().await;
        let sent = session
            .update_values([("PARENT", "221"), ("IRREP", "R4-"), ("DIRECTION", "P1")])
            .await
            .unwrap();
        assert_eq!(sent, 3);
        session.clear_values().await.unwrap();
        session.clear_shows().await.unwrap();
        assert!(session.values().is_empty());
        session.close().await.unwrap();
        assert_eq!(
            traffic(&launcher)[3..],
            ["CANCEL VALUE ALL", "CANCEL SHOW ALL", "QUIT"]
        );
    }

    /// Engine that rejects `VALUE BASIS bad`; the fault is only read back
    /// while waiting for the prompt before the next command
    fn basis_checking_engine() -> isodrive::ScriptedLauncher {
        isodrive::ScriptedLauncher::new(|exchange| match exchange.command {
            None => banner(),
            Some("VALUE BASIS bad") => vec![
                " Basis vectors are not a right-handed set".to_string(),
                "*".to_string(),
            ],
            Some(_) => prompt(),
        })
    }

    #[tokio::test]
    async fn test_value_is_recorded_only_once_written() {
        let launcher = basis_checking_engine();
        let mut session = Session::open(launcher.clone(), ProtocolConfig::default(), SessionOptions::new())
            .await
            .unwrap();

        assert!(session.set_value("BASIS", "bad").await.unwrap());
        assert!(matches!(
            session.set_value("ORIGIN", "0,0,0").await,
            Err(Error::InvalidBasis)
        ));
        assert!(!session.values().contains_key("ORIGIN"));

        // adjust the basis and retry
        assert!(session.set_value("BASIS", "good").await.unwrap());
        assert!(session.set_value("ORIGIN", "0,0,0").await.unwrap());
        session.close().await.unwrap();
        assert_eq!(
            traffic(&launcher),
            vec!["VALUE BASIS bad", "VALUE BASIS good", "VALUE ORIGIN 0,0,0", "QUIT"]
        );
    }

    #[tokio::test]
    async fn test_failed_show_and_delete_leave_mirror_unchanged() {
        let launcher = basis_checking_engine();
        let mut session = Session::open(
            launcher.clone(),
            ProtocolConfig::default(),
            SessionOptions::new().value("PARENT", 221),
        )
        .await
        .unwrap();

        session.set_value("BASIS", "bad").await.unwrap();
        assert!(matches!(session.add_show("IRREP").await, Err(Error::InvalidBasis)));
        assert!(!session.shows().contains("IRREP"));
        assert!(session.add_show("IRREP").await.unwrap());

        session.delete_value("BASIS").await.unwrap();
        session.set_value("BASIS", "bad").await.unwrap();
        assert!(matches!(session.delete_value("PARENT").await, Err(Error::InvalidBasis)));
        assert_eq!(session.values().get("PARENT"), Some("221"));
        session.delete_value("PARENT").await.unwrap();
        assert!(!session.values().contains_key("PARENT"));
        session.close().await.unwrap();

        assert_eq!(
            launcher.commands(0)[4..],
            [
                "VALUE BASIS bad",
                "SHOW IRREP",
                "CANCEL VALUE BASIS",
                "VALUE BASIS bad",
                "CANCEL VALUE PARENT",
                "QUIT"
            ]
        );
    }
}

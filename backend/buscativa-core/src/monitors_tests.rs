// src/monitors_tests.rs

#[cfg(test)]
mod tests {
    use std::fs;
    use tempfile::TempDir;

    use super::super::monitors::{MonitorDirectory, MonitorProfile};

    const MONITORS_CSV: &str = "\
usuario;senha;nome_completo;turno
jsilva;abc123;João Silva;Manhã

  mcosta ; s3nha ; Maria Costa ; Tarde
linha;quebrada
psouza;pw;Paulo Souza;Noite;coluna extra
";

    fn directory_with(content: &str) -> (TempDir, MonitorDirectory) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("monitores.csv");
        fs::write(&path, content).unwrap();
        (dir, MonitorDirectory::new(path))
    }

    #[test]
    fn test_valid_pairs_return_their_profile() {
        let (_dir, monitors) = directory_with(MONITORS_CSV);

        let profile = monitors.authenticate("jsilva", "abc123").unwrap();
        assert_eq!(
            profile,
            Some(MonitorProfile {
                username: "jsilva".to_string(),
                password: "abc123".to_string(),
                full_name: "João Silva".to_string(),
                shift: "Manhã".to_string(),
            })
        );

        let padded = monitors.authenticate("mcosta", "s3nha").unwrap().unwrap();
        assert_eq!(padded.full_name, "Maria Costa");
        assert_eq!(padded.shift, "Tarde");
    }

    #[test]
    fn test_other_pairs_do_not_match() {
        let (_dir, monitors) = directory_with(MONITORS_CSV);

        assert_eq!(monitors.authenticate("jsilva", "wrong").unwrap(), None);
        assert_eq!(monitors.authenticate("jsilva", "ABC123").unwrap(), None);
        assert_eq!(monitors.authenticate("JSILVA", "abc123").unwrap(), None);
        assert_eq!(monitors.authenticate("ninguem", "abc123").unwrap(), None);
        assert_eq!(monitors.authenticate("", "").unwrap(), None);
    }

    #[test]
    fn test_username_is_trimmed_before_lookup() {
        let (_dir, monitors) = directory_with(MONITORS_CSV);
        assert!(monitors.authenticate("  jsilva ", "abc123").unwrap().is_some());
    }

    #[test]
    fn test_header_blank_and_short_lines_are_skipped() {
        let (_dir, monitors) = directory_with(MONITORS_CSV);
        let loaded = monitors.load().unwrap();

        assert_eq!(loaded.len(), 3);
        assert!(!loaded.contains_key("usuario"));
        assert!(!loaded.contains_key("linha"));
        assert_eq!(loaded["psouza"].shift, "Noite");
    }

    #[test]
    fn test_header_detection_ignores_case() {
        let (_dir, monitors) = directory_with("USUARIO;SENHA;NOME;TURNO\nana;1;Ana;Tarde\n");
        let loaded = monitors.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded.contains_key("ana"));
    }

    #[test]
    fn test_last_duplicate_wins() {
        let (_dir, monitors) =
            directory_with("ana;velha;Ana Antiga;Manhã\nana;nova;Ana Nova;Tarde\n");
        assert_eq!(monitors.authenticate("ana", "velha").unwrap(), None);
        assert_eq!(
            monitors.authenticate("ana", "nova").unwrap().unwrap().full_name,
            "Ana Nova"
        );
    }

    #[test]
    fn test_missing_file_means_no_monitors() {
        let dir = TempDir::new().unwrap();
        let monitors = MonitorDirectory::new(dir.path().join("nao_existe.csv"));

        assert!(monitors.load().unwrap().is_empty());
        assert_eq!(monitors.authenticate("jsilva", "abc123").unwrap(), None);
    }

    #[test]
    fn test_file_is_reread_on_every_call() {
        let (dir, monitors) = directory_with("ana;1;Ana;Tarde\n");
        assert!(monitors.authenticate("bia", "2").unwrap().is_none());

        fs::write(dir.path().join("monitores.csv"), "ana;1;Ana;Tarde\nbia;2;Bia;Noite\n").unwrap();
        assert!(monitors.authenticate("bia", "2").unwrap().is_some());
    }
}

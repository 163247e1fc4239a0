//! SQL schema for the nexus staging warehouse.
//!
//! Executed once at connection startup. Column types follow the declared
//! types the row coercion layer understands: `NUMERIC` columns whose name
//! contains `flag` hold booleans, `DATETIME` columns hold timestamps.

/// Every entity table, in load order.
pub const TABLES: &[&str] = &[
  "research_study",
  "research_subject",
  "session",
  "device",
  "acquisition",
  "questionnaire_list",
  "questionnaire_item_list",
  "questionnaire",
  "questionnaire_response_list",
  "questionnaire_response",
];

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Projects whose devices are collected by the device load.
CREATE TABLE IF NOT EXISTS xnat_config (
    xnat_project_id TEXT PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS research_study (
    src_system                            TEXT,
    research_study_uri                    TEXT,
    research_study_id                     TEXT,
    research_study_id_type                TEXT,
    research_study_title                  TEXT,
    research_study_site                   TEXT,
    research_study_category               TEXT,
    research_study_description            TEXT,
    research_study_start_date             DATETIME,
    research_study_end_date               DATETIME,
    research_study_principal_investigator TEXT,
    research_study_status                 TEXT,
    xnat_custom_fields                    TEXT,
    _createdat                            DATETIME,
    _updatedat                            DATETIME,
    _rev                                  INTEGER
);

CREATE TABLE IF NOT EXISTS research_subject (
    src_system             TEXT,
    research_subject_uri   TEXT,
    research_subject_id    TEXT,
    research_study_uri     TEXT,
    research_study_title   TEXT,
    research_study_id      TEXT,
    research_study_id_type TEXT,
    xnat_custom_fields     TEXT,
    _createdat             DATETIME,
    _updatedat             DATETIME,
    _rev                   INTEGER
);

CREATE TABLE IF NOT EXISTS session (
    src_system             TEXT,
    research_study_id      TEXT,
    research_study_id_type TEXT,
    research_study_title   TEXT,
    research_study_uri     TEXT,
    research_subject_id    TEXT,
    research_subject_uri   TEXT,
    session_id             TEXT,
    accession_id           TEXT,
    session_type           TEXT,
    session_date           DATETIME,
    session_uri            TEXT,
    xnat_custom_fields     TEXT,
    _createdat             DATETIME,
    _updatedat             DATETIME,
    _rev                   INTEGER
);

CREATE TABLE IF NOT EXISTS device (
    src_system          TEXT,
    device_uri          TEXT,
    device_manufacturer TEXT,
    device_name         TEXT,
    _createdat          DATETIME,
    _updatedat          DATETIME,
    _rev                INTEGER
);

CREATE TABLE IF NOT EXISTS acquisition (
    src_system                 TEXT,
    research_study_id          TEXT,
    research_study_id_type     TEXT,
    research_subject_id        TEXT,
    session_id                 TEXT,
    session_type               TEXT,
    acquisition_id             TEXT,
    acquisition_type           TEXT,
    acquisition_modality       TEXT,
    acquisition_insert_date    DATETIME,
    acquisition_last_modified  DATETIME,
    acquisition_object_quality TEXT,
    device_manufacturer        TEXT,
    device_name                TEXT,
    session_date               DATETIME,
    research_study_uri         TEXT,
    research_study_title       TEXT,
    research_subject_uri       TEXT,
    session_uri                TEXT,
    device_uri                 TEXT,
    acquisition_uri            TEXT,
    accession_id               TEXT,
    acquisition_start_date     DATETIME,
    acquisition_start_time     TEXT,
    series_description         TEXT,
    _createdat                 DATETIME,
    _updatedat                 DATETIME,
    _rev                       INTEGER
);

CREATE TABLE IF NOT EXISTS questionnaire_list (
    src_system             TEXT,
    research_study_id      TEXT,
    research_study_id_type TEXT,
    research_study_title   TEXT,
    research_study_uri     TEXT,
    questionnaire_uri      TEXT,
    questionnaire_name     TEXT,
    questionnaire_title    TEXT,
    subject_type           TEXT,
    questionnaire_uuid     TEXT,
    xnat_data_type         TEXT,
    _createdat             DATETIME,
    _updatedat             DATETIME,
    _rev                   INTEGER
);

CREATE TABLE IF NOT EXISTS questionnaire_item_list (
    src_system             TEXT,
    research_study_id      TEXT,
    research_study_id_type TEXT,
    research_study_title   TEXT,
    research_study_uri     TEXT,
    question_id            TEXT,
    question_label         TEXT,
    question_type          TEXT,
    questionnaire_item_uri TEXT,
    questionnaire_name     TEXT,
    questionnaire_title    TEXT,
    questionnaire_uri      TEXT,
    required_flag          NUMERIC,
    question_description   TEXT,
    group_id               TEXT,
    group_uri              TEXT,
    enable_when_question   TEXT,
    enable_when_operator   TEXT,
    enable_when_answer     TEXT,
    validate               TEXT,
    repeats_flag           NUMERIC,
    questionnaire_uuid     TEXT,
    subject_type           TEXT,
    xnat_data_type         TEXT,
    _createdat             DATETIME,
    _updatedat             DATETIME,
    _rev                   INTEGER
);

-- One row per (question, answer option).
CREATE TABLE IF NOT EXISTS questionnaire (
    src_system                           TEXT,
    research_study_id                    TEXT,
    research_study_id_type               TEXT,
    research_study_title                 TEXT,
    research_study_uri                   TEXT,
    questionnaire_name                   TEXT,
    questionnaire_title                  TEXT,
    questionnaire_uri                    TEXT,
    question_id                          TEXT,
    question_label                       TEXT,
    question_type                        TEXT,
    required_flag                        NUMERIC,
    questionnaire_item_uri               TEXT,
    answer_option_code                   TEXT,
    answer_option_display                TEXT,
    questionnaire_item_answer_option_uri TEXT,
    question_description                 TEXT,
    group_id                             TEXT,
    group_uri                            TEXT,
    questionnaire_uuid                   TEXT,
    subject_type                         TEXT,
    xnat_data_type                       TEXT,
    _createdat                           DATETIME,
    _updatedat                           DATETIME,
    _rev                                 INTEGER
);

CREATE TABLE IF NOT EXISTS questionnaire_response_list (
    src_system                 TEXT,
    research_study_id          TEXT,
    research_study_id_type     TEXT,
    research_study_uri         TEXT,
    research_study_title       TEXT,
    questionnaire_uri          TEXT,
    questionnaire_label        TEXT,
    response_subject_uri       TEXT,
    response_subject_id        TEXT,
    questionnaire_response_uri TEXT,
    questionnaire_uuid         TEXT,
    response_subject_type      TEXT,
    subject_type               TEXT,
    xnat_data_type             TEXT,
    _createdat                 DATETIME,
    _updatedat                 DATETIME,
    _rev                       INTEGER
);

CREATE TABLE IF NOT EXISTS questionnaire_response (
    src_system                      TEXT,
    research_study_id               TEXT,
    research_study_id_type          TEXT,
    research_study_uri              TEXT,
    research_study_title            TEXT,
    questionnaire_uri               TEXT,
    questionnaire_label             TEXT,
    response_subject_uri            TEXT,
    response_subject_id             TEXT,
    response_text                   TEXT,
    question_type                   TEXT,
    questionnaire_item_uri          TEXT,
    question_label                  TEXT,
    response_code                   TEXT,
    response_code_display           TEXT,
    response_code_uri               TEXT,
    questionnaire_response_uri      TEXT,
    questionnaire_response_item_uri TEXT,
    question_group_id               TEXT,
    question_group_uri              TEXT,
    response_group_uri              TEXT,
    question_id                     TEXT,
    required_flag                   NUMERIC,
    response_list_group_uri         TEXT,
    response_index_in_list          TEXT,
    questionnaire_uuid              TEXT,
    response_subject_type           TEXT,
    subject_type                    TEXT,
    xnat_data_type                  TEXT,
    _createdat                      DATETIME,
    _updatedat                      DATETIME,
    _rev                            INTEGER
);

CREATE INDEX IF NOT EXISTS research_subject_study_idx ON research_subject(research_study_id);
CREATE INDEX IF NOT EXISTS session_study_idx          ON session(research_study_id);
CREATE INDEX IF NOT EXISTS acquisition_study_idx      ON acquisition(research_study_id);
CREATE INDEX IF NOT EXISTS response_study_idx
    ON questionnaire_response(research_study_id, response_subject_type);

PRAGMA user_version = 1;
";

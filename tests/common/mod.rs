//! In-process stand-in for a MySQL server, enough to drive the UDF workflow

#![allow(dead_code)]

use mysql_async::Value;
use std::collections::{BTreeMap, BTreeSet};

use udfkit::{ResultSet, SqlChannel, UdfkitError};

pub struct SimulatedServer {
    pub version: String,
    pub compile_os: String,
    pub compile_machine: String,
    pub plugin_dir: String,
    /// Files written with `INTO DUMPFILE`, path -> hex literal length
    pub files: BTreeMap<String, usize>,
    pub functions: BTreeSet<String>,
    /// Canned command output keyed by command text
    pub outputs: BTreeMap<String, Vec<u8>>,
    pub statements: Vec<String>,
    pub online: bool,
}

impl SimulatedServer {
    pub fn linux_x64() -> Self {
        Self {
            version: "5.7.44-log".to_string(),
            compile_os: "Linux".to_string(),
            compile_machine: "x86_64".to_string(),
            plugin_dir: "/usr/lib/mysql/plugin/".to_string(),
            files: BTreeMap::new(),
            functions: BTreeSet::new(),
            outputs: BTreeMap::new(),
            statements: Vec::new(),
            online: true,
        }
    }

    pub fn windows_x64() -> Self {
        Self {
            version: "8.0.35".to_string(),
            compile_os: "Win64".to_string(),
            compile_machine: "x86_64".to_string(),
            plugin_dir: r"C:\Program Files\MySQL\MySQL Server 8.0\lib\plugin\".to_string(),
            ..Self::linux_x64()
        }
    }

    pub fn with_output(mut self, command: &str, output: &[u8]) -> Self {
        self.outputs.insert(command.to_string(), output.to_vec());
        self
    }

    fn text_rows(columns: &[&str], values: &[&str]) -> ResultSet {
        ResultSet {
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
            rows: vec![values.iter().map(|v| Value::Bytes(v.as_bytes().to_vec())).collect()],
        }
    }

    fn check_online(&self) -> udfkit::Result<()> {
        if self.online {
            Ok(())
        } else {
            Err(UdfkitError::connection_failed("Can't connect to MySQL server on '10.0.0.5:3306'"))
        }
    }

    fn run_udf(&self, sql: &str) -> udfkit::Result<ResultSet> {
        if !self.functions.contains("sys_eval") {
            return Err(UdfkitError::query_failed(
                "ERROR 1305 (42000): FUNCTION mysql.sys_eval does not exist",
            ));
        }
        let command = sql
            .trim_start_matches("SELECT sys_eval('")
            .trim_end_matches("') AS result")
            .replace("\\'", "'");
        let output = self.outputs.get(&command).cloned().map_or(Value::NULL, Value::Bytes);

        Ok(ResultSet { columns: vec!["result".to_string()], rows: vec![vec![output]] })
    }

    fn dump_file(&mut self, sql: &str) -> udfkit::Result<u64> {
        let (literal, path) = sql
            .trim_start_matches("SELECT CAST(")
            .split_once(" AS BINARY) INTO DUMPFILE ")
            .ok_or_else(|| UdfkitError::query_failed("ERROR 1064 (42000): syntax error"))?;
        let path = path.trim_matches('\'').to_string();

        if self.files.contains_key(&path) {
            return Err(UdfkitError::query_failed(format!("ERROR 1086 (HY000): File '{path}' already exists")));
        }
        self.files.insert(path, literal.len());
        Ok(1)
    }

    fn create_function(&mut self, sql: &str) -> udfkit::Result<u64> {
        let library = sql.rsplit(' ').next().unwrap_or_default().trim_matches('\'');
        let installed = self.files.keys().any(|path| path.ends_with(library));
        if !installed {
            return Err(UdfkitError::query_failed(format!(
                "ERROR 1126 (HY000): Can't open shared library '{library}'"
            )));
        }
        if !self.functions.insert("sys_eval".to_string()) {
            return Err(UdfkitError::query_failed("ERROR 1125 (HY000): Function 'sys_eval' already exists"));
        }
        Ok(0)
    }
}

impl SqlChannel for SimulatedServer {
    async fn query(&mut self, sql: &str) -> udfkit::Result<ResultSet> {
        self.statements.push(sql.to_string());
        self.check_online()?;

        match sql {
            "SELECT 1" => Ok(Self::text_rows(&["1"], &["1"])),
            "SELECT VERSION()" => Ok(Self::text_rows(&["VERSION()"], &[self.version.as_str()])),
            "SELECT @@version_compile_os" => Ok(Self::text_rows(&["@@version_compile_os"], &[self.compile_os.as_str()])),
            "SELECT @@version_compile_machine" => {
                Ok(Self::text_rows(&["@@version_compile_machine"], &[self.compile_machine.as_str()]))
            }
            "SHOW VARIABLES LIKE 'plugin_dir'" => {
                Ok(Self::text_rows(&["Variable_name", "Value"], &["plugin_dir", self.plugin_dir.as_str()]))
            }
            udf if udf.starts_with("SELECT sys_eval(") => self.run_udf(udf),
            "SELECT user, host FROM mysql.user" => Ok(ResultSet {
                columns: vec!["user".to_string(), "host".to_string()],
                rows: vec![
                    vec![Value::Bytes(b"root".to_vec()), Value::Bytes(b"localhost".to_vec())],
                    vec![Value::Bytes(b"app".to_vec()), Value::Bytes(b"%".to_vec())],
                ],
            }),
            other => Err(UdfkitError::query_failed(format!("ERROR 1064 (42000): near '{other}'"))),
        }
    }

    async fn execute(&mut self, sql: &str) -> udfkit::Result<u64> {
        self.statements.push(sql.to_string());
        self.check_online()?;

        if sql.starts_with("SELECT CAST(") {
            self.dump_file(sql)
        } else if sql.starts_with("CREATE FUNCTION") {
            self.create_function(sql)
        } else if let Some(name) = sql.strip_prefix("DROP FUNCTION IF EXISTS ") {
            self.functions.remove(name);
            Ok(0)
        } else if sql.starts_with("UPDATE") || sql.starts_with("DELETE") || sql.starts_with("INSERT") {
            Ok(3)
        } else {
            Ok(0)
        }
    }
}

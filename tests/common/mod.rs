#![allow(dead_code)]

use permcheck::{
    Field, GrantTable, InMemoryDatabaseClient, InMemoryTopology, KeyspaceRoutingTable,
    PermissionValidator, QueryResult, ServerId, ValidatorConfig, Value,
};
use std::sync::Arc;

pub const KEYSPACE: &str = "test_keyspace";

const USER_PRIVS: &[&str] = &[
    "Select_priv",
    "Insert_priv",
    "Update_priv",
    "Delete_priv",
    "Create_priv",
    "Drop_priv",
    "Reload_priv",
    "Shutdown_priv",
    "Process_priv",
    "File_priv",
    "Grant_priv",
    "References_priv",
    "Index_priv",
    "Alter_priv",
    "Show_db_priv",
    "Super_priv",
    "Create_tmp_table_priv",
    "Lock_tables_priv",
    "Execute_priv",
    "Repl_slave_priv",
    "Repl_client_priv",
    "Create_view_priv",
    "Show_view_priv",
    "Create_routine_priv",
    "Alter_routine_priv",
    "Create_user_priv",
    "Event_priv",
    "Trigger_priv",
    "Create_tablespace_priv",
];

const DB_PRIVS: &[&str] = &[
    "Select_priv",
    "Insert_priv",
    "Update_priv",
    "Delete_priv",
    "Create_priv",
    "Drop_priv",
    "Grant_priv",
    "References_priv",
    "Index_priv",
    "Alter_priv",
    "Create_tmp_table_priv",
    "Lock_tables_priv",
    "Create_view_priv",
    "Show_view_priv",
    "Create_routine_priv",
    "Alter_routine_priv",
    "Execute_priv",
    "Event_priv",
    "Trigger_priv",
];

const HOST_PRIVS: &[&str] = &[
    "Select_priv",
    "Insert_priv",
    "Update_priv",
    "Delete_priv",
    "Create_priv",
    "Drop_priv",
    "Grant_priv",
    "References_priv",
    "Index_priv",
    "Alter_priv",
    "Create_tmp_table_priv",
    "Lock_tables_priv",
    "Create_view_priv",
    "Show_view_priv",
    "Create_routine_priv",
    "Alter_routine_priv",
    "Execute_priv",
    "Trigger_priv",
];

fn privilege_flags(count: usize, denied: &[usize]) -> Vec<Value> {
    (0..count)
        .map(|i| Value::text(if denied.contains(&i) { "N" } else { "Y" }))
        .collect()
}

fn user_fields() -> Vec<Field> {
    let mut fields = vec![
        Field::text("Host"),
        Field::text("User"),
        Field::text("Password"),
    ];
    fields.extend(USER_PRIVS.iter().map(|p| Field::text(*p)));
    fields.extend([
        Field::text("ssl_type"),
        Field::blob("ssl_cipher"),
        Field::blob("x509_issuer"),
        Field::blob("x509_subject"),
        Field::integer("max_questions"),
        Field::integer("max_updates"),
        Field::integer("max_connections"),
        Field::integer("max_user_connections"),
        Field::text("plugin"),
        Field::blob("authentication_string"),
        Field::text("password_expired"),
        Field::text("is_role"),
    ]);
    fields
}

fn user_row(host: &str, user: &str, password: &str, denied: &[usize]) -> Vec<Value> {
    let mut row = vec![Value::text(host), Value::text(user), Value::text(password)];
    row.extend(privilege_flags(USER_PRIVS.len(), denied));
    row.extend([
        Value::text(""),
        Value::text(""),
        Value::text(""),
        Value::text(""),
        // Integer limits arrive as decimal text, like they do on the wire.
        Value::text("0"),
        Value::text("0"),
        Value::text("0"),
        Value::text("0"),
        Value::text("mysql_native_password"),
        Value::text(""),
        Value::text("N"),
        Value::text("N"),
    ]);
    row
}

/// The three grant tables a healthy server of the fixture cluster returns.
#[derive(Debug, Clone, PartialEq)]
pub struct Grants {
    pub user: QueryResult,
    pub db: QueryResult,
    pub host: QueryResult,
}

impl Grants {
    pub fn standard() -> Self {
        let user = QueryResult::new(
            user_fields(),
            vec![
                user_row("test_host1", "test_user1", "test_password1", &[]),
                user_row("test_host2", "test_user2", "test_password2", &[6, 7, 8]),
                user_row("test_host3", "test_user3", "test_password3", &[6, 7, 8, 9, 15]),
            ],
        );

        let mut db_fields = vec![Field::text("Host"), Field::text("Db"), Field::text("User")];
        db_fields.extend(DB_PRIVS.iter().map(|p| Field::text(*p)));
        let mut db_row = vec![
            Value::text("test_host"),
            Value::text("test_db"),
            Value::text("test_user"),
        ];
        db_row.extend(privilege_flags(DB_PRIVS.len(), &[6, 13]));
        let db = QueryResult::new(db_fields, vec![db_row]);

        let mut host_fields = vec![Field::text("Host"), Field::text("Db")];
        host_fields.extend(HOST_PRIVS.iter().map(|p| Field::text(*p)));
        let mut host_row = vec![Value::text("test_host"), Value::text("test_db")];
        host_row.extend(privilege_flags(HOST_PRIVS.len(), &[6, 12]));
        let host = QueryResult::new(host_fields, vec![host_row]);

        Self { user, db, host }
    }

    pub fn table(&self, table: GrantTable) -> &QueryResult {
        match table {
            GrantTable::User => &self.user,
            GrantTable::Db => &self.db,
            GrantTable::Host => &self.host,
        }
    }

    pub fn table_mut(&mut self, table: GrantTable) -> &mut QueryResult {
        match table {
            GrantTable::User => &mut self.user,
            GrantTable::Db => &mut self.db,
            GrantTable::Host => &mut self.host,
        }
    }

    /// Replaces one cell, addressed by row index and field name.
    pub fn with_value(mut self, table: GrantTable, row: usize, field: &str, value: &str) -> Self {
        let result = self.table_mut(table);
        let index = result
            .fields
            .iter()
            .position(|f| f.name == field)
            .unwrap_or_else(|| panic!("no field {field} in {table}"));
        result.rows[row][index] = Value::text(value);
        self
    }

    pub fn without_last_row(mut self, table: GrantTable) -> Self {
        self.table_mut(table).rows.pop();
        self
    }

    pub fn without_field(mut self, table: GrantTable, field: &str) -> Self {
        let result = self.table_mut(table);
        let index = result
            .fields
            .iter()
            .position(|f| f.name == field)
            .unwrap_or_else(|| panic!("no field {field} in {table}"));
        result.fields.remove(index);
        for row in &mut result.rows {
            row.remove(index);
        }
        self
    }

    pub fn with_rows_reversed(mut self, table: GrantTable) -> Self {
        self.table_mut(table).rows.reverse();
        self
    }
}

pub struct TestCluster {
    pub topology: InMemoryTopology,
    pub client: InMemoryDatabaseClient,
}

impl TestCluster {
    /// Builds `test_keyspace` from `(shard, master, replicas)` triples and
    /// seeds every server with the standard grants.
    pub async fn new(shards: &[(&str, &str, &[&str])]) -> Self {
        let mut routing = KeyspaceRoutingTable::new(KEYSPACE).unwrap();
        let client = InMemoryDatabaseClient::new();
        for (shard, master, replicas) in shards {
            routing.set_shard_master(shard, *master).unwrap();
            routing
                .set_shard_replicas(shard, replicas.iter().map(|r| ServerId::from(*r)).collect())
                .unwrap();
            for server in std::iter::once(master).chain(replicas.iter()) {
                seed(&client, server, &Grants::standard()).await;
            }
        }

        let topology = InMemoryTopology::new();
        topology.register_keyspace(routing).await.unwrap();
        Self { topology, client }
    }

    /// One shard `0` with master `cell1-100` and replicas `cell1-101`, `cell1-102`.
    pub async fn single_shard() -> Self {
        Self::new(&[("0", "cell1-100", &["cell1-101", "cell1-102"])]).await
    }

    pub async fn set_grants(&self, server: &str, grants: &Grants) {
        seed(&self.client, server, grants).await;
    }

    pub fn validator(&self, config: ValidatorConfig) -> PermissionValidator {
        PermissionValidator::new(
            Arc::new(self.topology.clone()),
            Arc::new(self.client.clone()),
            config,
        )
        .unwrap()
    }
}

pub async fn seed(client: &InMemoryDatabaseClient, server: &str, grants: &Grants) {
    for table in GrantTable::ALL {
        client
            .set_query_result(server, table.query("mysql"), grants.table(table).clone())
            .await;
    }
}

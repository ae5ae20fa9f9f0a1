use crate::db::Database;
use crate::error::Result;
use crate::loader::load_files;
use crate::schema::SchemaDescription;
use std::path::Path;

const EMPLOYEES_CSV: &str = "\
id,name,department,salary,join_date
1,John Smith,Engineering,85000,2020-01-15
2,Jane Doe,Marketing,75000,2019-05-20
3,Bob Johnson,Engineering,90000,2018-03-10
4,Alice Williams,Sales,65000,2021-07-05
5,Charlie Brown,Engineering,80000,2020-02-28
";

const DEPARTMENTS_CSV: &str = "\
id,name,budget,location
1,Engineering,1000000,New York
2,Marketing,500000,San Francisco
3,Sales,750000,Chicago
4,HR,300000,New York
";

/// write the bundled sample files into `data_dir` and load them
#[tracing::instrument(skip(db, data_dir), fields(data_dir = %data_dir.display()))]
pub fn load_sample_data(db: &Database, data_dir: &Path) -> Result<SchemaDescription> {
    std::fs::create_dir_all(data_dir)?;

    let employees = data_dir.join("employees.csv");
    let departments = data_dir.join("departments.csv");

    std::fs::write(&employees, EMPLOYEES_CSV)?;
    std::fs::write(&departments, DEPARTMENTS_CSV)?;

    load_files(db, &[("employees", employees), ("departments", departments)])
}

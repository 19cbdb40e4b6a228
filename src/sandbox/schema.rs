pub const SANDBOX_SCHEMA: &str = r#"
PRAGMA foreign_keys = 1;

CREATE TABLE IF NOT EXISTS departments (
    id INTEGER PRIMARY KEY,
    name VARCHAR(100) NOT NULL,
    location VARCHAR(100)
);

CREATE TABLE IF NOT EXISTS employees (
    id INTEGER PRIMARY KEY,
    name VARCHAR(100) NOT NULL,
    department_id INTEGER,
    manager_id INTEGER,
    salary DECIMAL(10,2),
    hire_date DATE,
    FOREIGN KEY (department_id) REFERENCES departments (id),
    FOREIGN KEY (manager_id) REFERENCES employees (id)
);

CREATE TABLE IF NOT EXISTS projects (
    id INTEGER PRIMARY KEY,
    name VARCHAR(100) NOT NULL,
    start_date DATE,
    end_date DATE
);

CREATE TABLE IF NOT EXISTS employee_projects (
    employee_id INTEGER NOT NULL,
    project_id INTEGER NOT NULL,
    role VARCHAR(100),
    PRIMARY KEY (employee_id, project_id),
    FOREIGN KEY (employee_id) REFERENCES employees (id),
    FOREIGN KEY (project_id) REFERENCES projects (id)
);

CREATE TABLE IF NOT EXISTS products (
    id INTEGER PRIMARY KEY,
    name VARCHAR(100) NOT NULL,
    category VARCHAR(100),
    price DECIMAL(10,2) NOT NULL
);

CREATE TABLE IF NOT EXISTS customers (
    id INTEGER PRIMARY KEY,
    name VARCHAR(100) NOT NULL,
    email VARCHAR(100),
    region VARCHAR(100)
);

CREATE TABLE IF NOT EXISTS sales (
    id INTEGER PRIMARY KEY,
    product_id INTEGER,
    customer_id INTEGER,
    sale_date DATE NOT NULL,
    quantity INTEGER NOT NULL,
    amount DECIMAL(10,2) NOT NULL,
    FOREIGN KEY (product_id) REFERENCES products (id),
    FOREIGN KEY (customer_id) REFERENCES customers (id)
);

INSERT OR IGNORE INTO departments (id, name, location) VALUES
    (1, 'Engineering', 'Building A'),
    (2, 'Marketing', 'Building B'),
    (3, 'HR', 'Building A'),
    (4, 'Finance', 'Building C');

INSERT OR IGNORE INTO employees (id, name, department_id, manager_id, salary, hire_date) VALUES
    (1, 'John Doe', 1, NULL, 5000, '2020-01-15'),
    (2, 'Jane Smith', 1, 1, 6000, '2019-05-20'),
    (3, 'Bob Johnson', 1, 2, 4500, '2021-03-10'),
    (4, 'Alice Brown', 1, 1, 5500, '2018-11-01'),
    (5, 'Charlie Wilson', 1, 3, 4800, '2021-07-15'),
    (6, 'Dave Miller', 2, 1, 6500, '2017-09-20'),
    (7, 'Eve Davis', 2, 2, 5200, '2020-04-12'),
    (8, 'Frank White', 2, 3, 4900, '2021-01-25'),
    (9, 'Grace Taylor', 3, 4, 5300, '2019-08-05'),
    (10, 'Henry Martin', 3, 6, 6200, '2018-03-15');

INSERT OR IGNORE INTO projects (id, name, start_date, end_date) VALUES
    (1, 'Website Redesign', '2022-01-01', '2022-03-15'),
    (2, 'Mobile App', '2022-02-15', '2022-06-30'),
    (3, 'Database Migration', '2022-04-01', '2022-08-15'),
    (4, 'Cloud Migration', '2022-05-15', '2022-12-31');

INSERT OR IGNORE INTO employee_projects (employee_id, project_id, role) VALUES
    (1, 1, 'Lead'),
    (2, 1, 'Designer'),
    (3, 1, 'Developer'),
    (1, 2, 'Consultant'),
    (2, 2, 'Lead'),
    (5, 2, 'Developer'),
    (1, 3, 'Reviewer'),
    (3, 3, 'Developer'),
    (6, 3, 'Lead'),
    (7, 4, 'Designer'),
    (8, 4, 'Developer'),
    (6, 4, 'Reviewer');

INSERT OR IGNORE INTO products (id, name, category, price) VALUES
    (1, 'Laptop', 'Electronics', 1200.00),
    (2, 'Smartphone', 'Electronics', 800.00),
    (3, 'Chair', 'Furniture', 150.00),
    (4, 'Desk', 'Furniture', 250.00),
    (5, 'Headphones', 'Electronics', 80.00);

INSERT OR IGNORE INTO customers (id, name, email, region) VALUES
    (1, 'Acme Corp', 'acme@example.com', 'North'),
    (2, 'XYZ Industries', 'xyz@example.com', 'South'),
    (3, 'Global Services', 'global@example.com', 'East'),
    (4, 'Local Business', 'local@example.com', 'West'),
    (5, 'Super Retail', 'super@example.com', 'North');

INSERT OR IGNORE INTO sales (id, product_id, customer_id, sale_date, quantity, amount) VALUES
    (1, 1, 1, '2023-01-05', 5, 6000.00),
    (2, 2, 2, '2023-01-10', 3, 2400.00),
    (3, 1, 3, '2023-01-15', 2, 2400.00),
    (4, 3, 4, '2023-01-20', 10, 1500.00),
    (5, 5, 5, '2023-01-25', 15, 1200.00),
    (6, 1, 2, '2023-02-05', 7, 8400.00),
    (7, 2, 1, '2023-02-10', 4, 3200.00),
    (8, 4, 3, '2023-02-15', 3, 750.00),
    (9, 5, 4, '2023-02-20', 20, 1600.00),
    (10, 3, 5, '2023-02-25', 5, 750.00),
    (11, 1, 3, '2023-03-05', 6, 7200.00),
    (12, 2, 2, '2023-03-10', 5, 4000.00),
    (13, 3, 1, '2023-03-15', 8, 1200.00),
    (14, 4, 5, '2023-03-20', 4, 1000.00),
    (15, 5, 4, '2023-03-25', 12, 960.00);
"#;

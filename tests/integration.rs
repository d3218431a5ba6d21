use std::{cell::RefCell, rc::Rc, str::from_utf8};

use cute_teller::{
    bin_utils::{Script, ScriptError, seed_accounts},
    service::{Outcome, TransferService},
    store::in_memory_store::InMemoryAccountStore,
};

const ACCOUNTS: &str = include_str!("accounts.csv");
const OPERATIONS: &str = include_str!("operations.csv");

type Lines = Rc<RefCell<Vec<(u64, String)>>>;

async fn run_script(operations: &str) -> (String, Vec<(u64, String)>, Vec<(u64, String)>) {
    let store = InMemoryAccountStore::default();
    let seeded = seed_accounts(&store, ACCOUNTS.as_bytes()).await.unwrap();
    assert_eq!(seeded, 5);

    let successes: Lines = Rc::default();
    let errors: Lines = Rc::default();
    let mut output = Vec::new();
    let script = Script {
        operations: operations.as_bytes(),
        output: &mut output,
        success_printer: Box::new({
            let successes = successes.clone();
            move |line: u64, outcome: Outcome| successes.borrow_mut().push((line, outcome.to_string()))
        }),
        error_printer: Box::new({
            let errors = errors.clone();
            move |line: u64, err: ScriptError| errors.borrow_mut().push((line, err.to_string()))
        }),
    };
    script.run(&TransferService::new(store)).await.unwrap();

    let output = from_utf8(&output).unwrap().to_owned();
    let successes = successes.borrow().clone();
    let errors = errors.borrow().clone();
    (output, successes, errors)
}

#[tokio::test]
async fn process_operations() {
    let (output, successes, errors) = run_script(OPERATIONS).await;

    assert_eq!(
        successes,
        vec![
            (2, "Transferred 100 from Bruce (id=1) to Clark (id=2)".to_string()),
            (4, "Removed account Arthur (id=5)".to_string()),
            (8, "Transferred 20 from Diana (id=3) to Diana (id=3)".to_string()),
        ]
    );

    let lines: Vec<u64> = errors.iter().map(|(line, _)| *line).collect();
    assert_eq!(lines, vec![3, 5, 6, 7, 9, 10]);
    assert_eq!(
        errors[0].1,
        "Insufficient funds: account id=2 holds 150.00, but a transfer of 10000 was requested"
    );
    assert_eq!(
        errors[1].1,
        "Account id=1 cannot be removed while its balance is 50.00"
    );
    assert_eq!(errors[2].1, "Account with id=99 does not exist");
    assert_eq!(
        errors[3].1,
        "Transfer amount must be positive with at most 2 decimal places, got -5"
    );
    assert!(errors[4].1.starts_with("Malformed row:"));
    assert_eq!(errors[5].1, "Field `amount` is required for Transfer");

    assert_eq!(
        output,
        "id,name,balance\n\
         1,Bruce,50.00\n\
         2,Clark,150.00\n\
         3,Diana,300.00\n\
         4,Barry,25.50\n"
    );
}

#[tokio::test]
async fn rejected_operations_change_nothing() {
    let (output, successes, errors) = run_script(
        "op,from,to,amount\n\
         transfer,4,1,25.51\n\
         transfer,4,1,25.51\n\
         delete,2\n\
         transfer,1,77,1\n\
         delete,77\n",
    )
    .await;

    assert!(successes.is_empty());
    assert_eq!(errors.len(), 5);
    assert_eq!(errors[0].1, errors[1].1);
    assert_eq!(
        output,
        "id,name,balance\n\
         1,Bruce,150.00\n\
         2,Clark,50.00\n\
         3,Diana,300.00\n\
         4,Barry,25.50\n\
         5,Arthur,0.00\n"
    );
}

// Text menu shared by the networked client and the in-process demo. Choices
// 0-5 are sent as operation codes; any other number is forwarded too so the
// service can reject it.

use crate::error::Result;
use crate::network::{LedgerService, Operation, RequestMessage};
use crate::wallet::Wallet;
use std::io::{BufRead, Write};

pub const EXIT_CHOICE: i64 = 6;

pub fn display_menu<W: Write>(output: &mut W) -> Result<()> {
    writeln!(output, "\nBlockchain Menu:")?;
    writeln!(output, "0. View basic blockchain status.")?;
    writeln!(output, "1. Add a transaction to the blockchain.")?;
    writeln!(output, "2. Verify the blockchain.")?;
    writeln!(output, "3. View the blockchain.")?;
    writeln!(output, "4. Corrupt the chain.")?;
    writeln!(output, "5. Hide corruption by repairing the chain.")?;
    writeln!(output, "6. Exit.")?;
    write!(output, "Enter your choice: ")?;
    output.flush()?;
    Ok(())
}

pub fn display_keys<W: Write>(output: &mut W, wallet: &Wallet) -> Result<()> {
    writeln!(
        output,
        "Public Key (e, n): ({}, {})",
        wallet.get_public_key_e(),
        wallet.get_public_key_n()
    )?;
    writeln!(output, "Client ID: {}", wallet.get_client_id())?;
    Ok(())
}

/// Run the menu until the user exits or input ends
pub fn run_menu<S, R, W>(
    service: &mut S,
    wallet: Option<&Wallet>,
    input: &mut R,
    output: &mut W,
) -> Result<()>
where
    S: LedgerService + ?Sized,
    R: BufRead,
    W: Write,
{
    loop {
        display_menu(output)?;
        let line = match read_line(input)? {
            Some(line) => line,
            None => break,
        };
        let choice = match line.trim().parse::<i64>() {
            Ok(choice) => choice,
            Err(_) => {
                writeln!(output, "Invalid choice. Please try again.")?;
                continue;
            }
        };
        if choice == EXIT_CHOICE {
            break;
        }

        let (data, difficulty) = match Operation::try_from(choice) {
            Ok(Operation::AddTransaction) => {
                let difficulty = match prompt(input, output, "Enter difficulty > 1: ")? {
                    Some(raw) => match raw.trim().parse::<u32>() {
                        Ok(difficulty) => difficulty,
                        Err(_) => {
                            writeln!(output, "Difficulty must be a non-negative integer.")?;
                            continue;
                        }
                    },
                    None => break,
                };
                match prompt(input, output, "Enter transaction: ")? {
                    Some(data) => (data, difficulty),
                    None => break,
                }
            }
            Ok(Operation::Corrupt) => {
                let block_id = match prompt(input, output, "Enter block ID to corrupt: ")? {
                    Some(raw) => raw.trim().to_string(),
                    None => break,
                };
                let label = format!("Enter new data for block {block_id}: ");
                match prompt(input, output, &label)? {
                    Some(new_data) => (format!("{block_id},{new_data}"), 0),
                    None => break,
                }
            }
            _ => (String::new(), 0),
        };

        let mut request = RequestMessage {
            operation: choice,
            ..RequestMessage::new(Operation::Status, &data, difficulty)
        };
        if let Some(wallet) = wallet {
            request = request.signed_by(wallet);
        }

        let response = service.submit(&request)?;
        writeln!(output, "{}", response.data)?;
        if response.execution_time > 0 {
            writeln!(
                output,
                "Execution time: {} milliseconds",
                response.execution_time
            )?;
        }
    }
    Ok(())
}

fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W, text: &str) -> Result<Option<String>> {
    write!(output, "{text}")?;
    output.flush()?;
    read_line(input)
}

// None on end of input
fn read_line<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}
